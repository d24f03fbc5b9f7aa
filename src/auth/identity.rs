/// Request-scoped identity
///
/// The JWT middleware stores an `AuthenticatedUser` in the request extensions;
/// handlers take it as an argument.

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::error::{AppError, AuthError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
}

impl AuthenticatedUser {
    /// `Forbidden` unless the caller is `owner_id`
    pub fn ensure_is(&self, owner_id: i64) -> Result<(), AppError> {
        if self.user_id == owner_id {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %self.user_id,
                owner_id = %owner_id,
                "Operation on another user's resource rejected"
            );
            Err(AuthError::Forbidden.into())
        }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let identity = req
            .extensions()
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or(AppError::Auth(AuthError::MissingToken));
        ready(identity)
    }
}
