/// Authentication Routes
///
/// Registration, login, token refresh, logout and current user information.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use super::required;
use super::users::UserResponse;
use crate::auth::{AuthService, AuthenticatedUser, TokenPair};
use crate::error::{AppError, AuthError, ErrorContext};
use crate::repository::UserRepository;

/// User registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// User login request
///
/// `email` may hold a username instead.
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "username", alias = "identifier")]
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Token refresh and logout request
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Authentication response with the user and a fresh token pair
#[derive(Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// POST /auth/register
///
/// # Errors
/// - 400: invalid email, username or weak password
/// - 409: email or username already registered
pub async fn register(
    form: web::Json<RegisterRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");
    let form = form.into_inner();

    let email = required("email", form.email)?;
    let username = required("username", form.username)?;
    let password = required("password", form.password)?;

    let (user, tokens) = auth
        .register(&email, &username, &password)
        .await
        .map_err(|e| context.log_error(e))?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(AuthResponse {
        user: user.into(),
        tokens,
    }))
}

/// POST /auth/login
///
/// Unknown identifier and wrong password produce the same 401.
pub async fn login(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");
    let form = form.into_inner();

    let identifier = required("email", form.email)?;
    let password = required("password", form.password)?;

    let (user, tokens) = auth
        .login(&identifier, &password)
        .await
        .map_err(|e| context.log_error(e))?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(AuthResponse {
        user: user.into(),
        tokens,
    }))
}

/// POST /auth/refresh
///
/// Both tokens rotate; the submitted refresh token cannot be used again.
///
/// # Errors
/// - 401: invalid, expired, or already used refresh token
/// - 404: the user no longer exists
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");
    let refresh_token = required("refresh_token", form.into_inner().refresh_token)?;

    let tokens = auth
        .refresh(&refresh_token)
        .await
        .map_err(|e| context.log_error(e))?;

    Ok(HttpResponse::Ok().json(tokens))
}

/// POST /auth/logout
pub async fn logout(
    form: web::Json<RefreshRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = required("refresh_token", form.into_inner().refresh_token)?;
    auth.logout(&refresh_token).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/logout-all
///
/// Revokes every refresh token of the caller. Access tokens stay valid until
/// they expire.
pub async fn logout_all(
    user: AuthenticatedUser,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let revoked = auth.logout_all(user.user_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "revoked": revoked })))
}

/// GET /api/me
pub async fn current_user(
    user: AuthenticatedUser,
    users: web::Data<dyn UserRepository>,
) -> Result<HttpResponse, AppError> {
    let record = users
        .find_by_id(user.user_id)
        .await?
        .ok_or(AppError::Auth(AuthError::UserNotFound))?;

    Ok(HttpResponse::Ok().json(UserResponse::from(record)))
}
