/// User Routes
///
/// Users may read anyone's profile but only change or delete their own.

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::locations::views_for;
use crate::auth::{AuthService, AuthenticatedUser};
use crate::error::{AppError, ErrorContext};
use crate::models::{User, UserChanges};
use crate::repository::{LocationRepository, MembershipRepository, ShareRepository, UserRepository};
use crate::validators::{is_valid_email, is_valid_username};

/// Public view of a user; the password hash never leaves the server
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user_id: i64,
    pub email: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            username: user.username,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// GET /api/users
pub async fn list_users(users: web::Data<dyn UserRepository>) -> Result<HttpResponse, AppError> {
    let all: Vec<UserResponse> = users.list().await?.into_iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(all))
}

/// GET /api/users/{id}
pub async fn get_user(
    path: web::Path<i64>,
    users: web::Data<dyn UserRepository>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let user = users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {}", user_id)))?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// PUT /api/users/{id}
///
/// Absent fields are left unchanged. A new password goes through the same
/// strength rules as registration.
///
/// # Errors
/// - 403: updating another user
/// - 409: email or username taken
pub async fn update_user(
    path: web::Path<i64>,
    form: web::Json<UpdateUserRequest>,
    caller: AuthenticatedUser,
    users: web::Data<dyn UserRepository>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let context = ErrorContext::new("update_user").with_user_id(caller.user_id);
    caller.ensure_is(user_id)?;

    let form = form.into_inner();
    let email = form.email.as_deref().map(is_valid_email).transpose()?;
    let username = form.username.as_deref().map(is_valid_username).transpose()?;
    let password_hash = match form.password {
        Some(password) => Some(auth.hash_new_password(&password).await?),
        None => None,
    };
    let changes = UserChanges {
        email,
        username,
        password_hash,
    };

    let user = users
        .update(user_id, &changes)
        .await
        .map_err(|e| context.log_error(e))?;

    tracing::info!(request_id = %context.request_id, user_id = %user_id, "User updated");
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// DELETE /api/users/{id}
///
/// Cascades to the user's locations, memberships and refresh tokens.
pub async fn delete_user(
    path: web::Path<i64>,
    caller: AuthenticatedUser,
    users: web::Data<dyn UserRepository>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    caller.ensure_is(user_id)?;

    users.delete(user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/users/{id}/locations
///
/// Another user's coordinates are null unless visibly shared.
pub async fn list_user_locations(
    path: web::Path<i64>,
    caller: AuthenticatedUser,
    locations: web::Data<dyn LocationRepository>,
    shares: web::Data<dyn ShareRepository>,
) -> Result<HttpResponse, AppError> {
    let owned = locations.list_by_owner(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(views_for(owned, caller.user_id, shares.get_ref()).await?))
}

/// GET /api/users/{id}/groups
pub async fn list_user_groups(
    path: web::Path<i64>,
    memberships: web::Data<dyn MembershipRepository>,
) -> Result<HttpResponse, AppError> {
    let groups = memberships.list_groups_of(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(groups))
}
