/// Refresh Token Storage Keys
///
/// Refresh tokens are stored as SHA-256 hashes only. The plaintext JWT is
/// what the client holds.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a refresh token
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
