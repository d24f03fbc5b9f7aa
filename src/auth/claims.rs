/// JWT Claims structure
///
/// Payload shared by access and refresh tokens. Which secret signed the
/// token is what tells the two kinds apart.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TokenError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject (numeric user id as a decimal string)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Unique token id, so two tokens issued in the same second differ
    pub jti: String,
}

impl Claims {
    /// Create claims for `user_id` valid for `expiry_seconds` from now
    pub fn new(user_id: i64, expiry_seconds: i64, issuer: &str) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer.to_string(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Numeric user id carried in the subject
    ///
    /// # Errors
    /// `TokenError::Malformed` if the subject is not a number
    pub fn user_id(&self) -> Result<i64, TokenError> {
        self.sub.parse::<i64>().map_err(|_| TokenError::Malformed)
    }
}
