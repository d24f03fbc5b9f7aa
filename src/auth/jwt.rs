/// JWT Token Generation and Validation
///
/// Access and refresh tokens are HS256 JWTs signed with separate secrets,
/// so a refresh token never passes as an access token and vice versa.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, TokenError};

const BEARER_PREFIX: &str = "Bearer ";

/// Token text without an optional `"Bearer "` prefix
pub fn strip_bearer(token: &str) -> &str {
    token.strip_prefix(BEARER_PREFIX).unwrap_or(token).trim()
}

fn sign(claims: &Claims, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Issue an access token for `user_id`
///
/// # Errors
/// Returns error if signing fails
pub fn issue_access_token(user_id: i64, config: &JwtSettings) -> Result<String, AppError> {
    let claims = Claims::new(user_id, config.access_token_expiry, &config.issuer);
    sign(&claims, &config.access_secret)
}

/// Issue a refresh token for `user_id`, signed with the refresh secret
///
/// Returns the token together with its expiry timestamp.
///
/// # Errors
/// Returns error if signing fails
pub fn issue_refresh_token(user_id: i64, config: &JwtSettings) -> Result<(String, i64), AppError> {
    let claims = Claims::new(user_id, config.refresh_token_expiry, &config.issuer);
    let token = sign(&claims, &config.refresh_secret)?;
    Ok((token, claims.exp))
}

/// Verify a token against `secret` and `issuer`
///
/// An optional `"Bearer "` prefix is stripped. Expiry is checked with no leeway.
///
/// # Errors
/// * `InvalidSignature` - signed with another secret or tampered with
/// * `Expired` - past its `exp`
/// * `Malformed` - not a JWT, missing claims, wrong issuer or non-numeric subject
pub fn verify_token(secret: &str, issuer: &str, token: &str) -> Result<Claims, TokenError> {
    let token = strip_bearer(token);

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_issuer(&[issuer]);

    let claims = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            let err = match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            };
            tracing::debug!(error = %e, "JWT validation failed");
            err
        })?;

    claims.user_id()?;
    Ok(claims)
}

/// Validate an access token and return its claims
pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<Claims, TokenError> {
    verify_token(&config.access_secret, &config.issuer, token)
}

/// Validate a refresh token and return its claims
pub fn validate_refresh_token(token: &str, config: &JwtSettings) -> Result<Claims, TokenError> {
    verify_token(&config.refresh_secret, &config.issuer, token)
}
