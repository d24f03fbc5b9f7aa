/// Authentication Service
///
/// Registration, login, token refresh and logout on top of the credential
/// and refresh-token stores. Handlers stay thin and call into this.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::auth::jwt::{issue_access_token, issue_refresh_token, strip_bearer, validate_refresh_token};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::auth::refresh_token::hash_token;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, TokenError, ValidationError};
use crate::models::{NewUser, User};
use crate::repository::{RefreshTokenRepository, UserRepository};
use crate::validators::{is_valid_email, is_valid_username};

/// Compared against when the login identifier matches nobody
const DUMMY_PASSWORD: &str = "DummyPassword123";

/// A freshly issued access/refresh token pair
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    jwt: JwtSettings,
    hash_cost: u32,
    dummy_hash: String,
}

/// Run CPU-heavy bcrypt work off the async executor
async fn blocking<F, T>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))?
}

impl AuthService {
    /// # Errors
    /// Returns error if the dummy hash cannot be computed at `hash_cost`
    pub fn new(
        users: Arc<dyn UserRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        jwt: JwtSettings,
        hash_cost: u32,
    ) -> Result<Self, AppError> {
        let dummy_hash = hash_password(DUMMY_PASSWORD, hash_cost)?;
        Ok(Self {
            users,
            refresh_tokens,
            jwt,
            hash_cost,
            dummy_hash,
        })
    }

    /// Check strength rules and hash a new password at the configured cost
    pub async fn hash_new_password(&self, password: &str) -> Result<String, AppError> {
        validate_password_strength(password)?;
        let password = password.to_string();
        let cost = self.hash_cost;
        blocking(move || hash_password(&password, cost)).await
    }

    /// Register a new user and log them in
    ///
    /// # Errors
    /// * `Validation` - bad email, username or weak password
    /// * `DuplicateIdentity` - email or username already taken
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<(User, TokenPair), AppError> {
        let email = is_valid_email(email)?;
        let username = is_valid_username(username)?;
        validate_password_strength(password)?;

        if self.users.find_by_email(&email).await?.is_some()
            || self.users.find_by_username(&username).await?.is_some()
        {
            return Err(AuthError::DuplicateIdentity.into());
        }

        let password_hash = self.hash_new_password(password).await?;
        let user = self
            .users
            .create(&NewUser {
                email,
                username,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = %user.id, "User registered");
        let tokens = self.issue_pair(user.id).await?;
        Ok((user, tokens))
    }

    /// Log in by email, falling back to username
    ///
    /// Unknown identifiers and wrong passwords fail the same way and take the
    /// same time: a bcrypt comparison runs in both cases.
    ///
    /// # Errors
    /// * `Validation` - empty identifier or password
    /// * `InvalidCredentials` - no match
    pub async fn login(&self, identifier: &str, password: &str) -> Result<(User, TokenPair), AppError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(ValidationError::EmptyField("identifier".to_string()).into());
        }
        if password.is_empty() {
            return Err(ValidationError::EmptyField("password".to_string()).into());
        }

        let user = match self.users.find_by_email(&identifier.to_lowercase()).await? {
            Some(user) => Some(user),
            None => self.users.find_by_username(identifier).await?,
        };

        let stored_hash = user
            .as_ref()
            .map(|u| u.password_hash.clone())
            .unwrap_or_else(|| self.dummy_hash.clone());
        let candidate = password.to_string();
        let password_matches = blocking(move || verify_password(&candidate, &stored_hash)).await?;

        match user {
            Some(user) if password_matches => {
                tracing::info!(user_id = %user.id, "User logged in");
                let tokens = self.issue_pair(user.id).await?;
                Ok((user, tokens))
            }
            _ => Err(AuthError::InvalidCredentials.into()),
        }
    }

    /// Exchange a refresh token for a new pair; the old refresh token is spent
    ///
    /// # Errors
    /// * `InvalidToken` - bad signature, expired, malformed, or already used
    /// * `UserNotFound` - the user was deleted since the token was issued
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let claims = validate_refresh_token(refresh_token, &self.jwt)?;
        let user_id = claims.user_id()?;

        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AuthError::UserNotFound.into());
        }

        let token_hash = hash_token(strip_bearer(refresh_token));
        let now = Utc::now().timestamp();
        if !self.refresh_tokens.consume(user_id, &token_hash, now).await? {
            tracing::warn!(user_id = %user_id, "Refresh token reused or revoked");
            return Err(TokenError::Revoked.into());
        }

        tracing::info!(user_id = %user_id, "Tokens refreshed");
        self.issue_pair(user_id).await
    }

    /// Revoke one refresh token; revoking twice is fine
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        let claims = validate_refresh_token(refresh_token, &self.jwt)?;
        let token_hash = hash_token(strip_bearer(refresh_token));
        self.refresh_tokens.revoke(&token_hash).await?;

        tracing::info!(user_id = %claims.sub, "User logged out");
        Ok(())
    }

    /// Revoke every refresh token of `user_id`
    pub async fn logout_all(&self, user_id: i64) -> Result<u64, AppError> {
        self.refresh_tokens.revoke_all_for_user(user_id).await
    }

    async fn issue_pair(&self, user_id: i64) -> Result<TokenPair, AppError> {
        let access_token = issue_access_token(user_id, &self.jwt)?;
        let (refresh_token, expires_at) = issue_refresh_token(user_id, &self.jwt)?;

        self.refresh_tokens
            .save(user_id, &hash_token(&refresh_token), expires_at)
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.access_token_expiry,
        })
    }
}
