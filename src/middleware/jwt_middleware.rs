/// JWT Authentication Middleware
///
/// Validates the access token from the Authorization header and injects an
/// `AuthenticatedUser` into request extensions for use by route handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{validate_access_token, AuthenticatedUser};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, TokenError};

/// JWT middleware for protecting routes
///
/// Requests without a valid access token are rejected with 401 before the
/// wrapped service runs.
pub struct JwtMiddleware {
    jwt_config: Rc<JwtSettings>,
}

impl JwtMiddleware {
    /// Create new JWT middleware instance
    pub fn new(jwt_config: JwtSettings) -> Self {
        Self {
            jwt_config: Rc::new(jwt_config),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            jwt_config: self.jwt_config.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    jwt_config: Rc<JwtSettings>,
}

/// Resolve the caller from the Authorization header
fn authenticate(req: &ServiceRequest, jwt_config: &JwtSettings) -> Result<AuthenticatedUser, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AppError::Auth(AuthError::MissingToken))?;

    // The "Bearer " prefix is optional
    let token = header
        .to_str()
        .map_err(|_| AppError::Auth(AuthError::InvalidToken(TokenError::Malformed)))?;

    let claims = validate_access_token(token, jwt_config)?;
    Ok(AuthenticatedUser {
        user_id: claims.user_id()?,
    })
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match authenticate(&req, &self.jwt_config) {
            Ok(identity) => {
                req.extensions_mut().insert(identity);
                tracing::debug!(
                    user_id = %identity.user_id,
                    path = %req.path(),
                    "JWT validated successfully"
                );

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                tracing::warn!(path = %req.path(), error = %e, "Request rejected by JWT middleware");
                Box::pin(async move { Err(e.into()) })
            }
        }
    }
}
