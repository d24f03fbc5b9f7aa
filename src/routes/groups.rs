/// Group Routes
///
/// Group CRUD plus the nested member and shared-location associations.
/// Sharing, re-flagging and unsharing a location is reserved to its owner.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::locations::find_location;
use super::required;
use super::users::UserResponse;
use crate::auth::AuthenticatedUser;
use crate::error::{AppError, ErrorContext};
use crate::models::SharedLocation;
use crate::repository::{GroupRepository, LocationRepository, MembershipRepository, ShareRepository};
use crate::validators::is_valid_name;

#[derive(Deserialize)]
pub struct GroupRequest {
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Option<i64>,
}

fn visible_by_default() -> bool {
    true
}

#[derive(Deserialize)]
pub struct ShareLocationRequest {
    pub location_id: Option<i64>,
    #[serde(default = "visible_by_default")]
    pub is_visible_coordinates: bool,
}

#[derive(Deserialize)]
pub struct ShareVisibilityRequest {
    pub is_visible_coordinates: Option<bool>,
}

/// POST /api/groups
///
/// The creator is not added as a member.
pub async fn create_group(
    form: web::Json<GroupRequest>,
    caller: AuthenticatedUser,
    groups: web::Data<dyn GroupRepository>,
) -> Result<HttpResponse, AppError> {
    let name = is_valid_name("name", &required("name", form.into_inner().name)?)?;

    let group = groups.create(&name).await?;
    tracing::info!(user_id = %caller.user_id, group_id = %group.id, "Group created by user");
    Ok(HttpResponse::Created().json(group))
}

/// GET /api/groups
pub async fn list_groups(groups: web::Data<dyn GroupRepository>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(groups.list().await?))
}

/// GET /api/groups/{id}
pub async fn get_group(
    path: web::Path<i64>,
    groups: web::Data<dyn GroupRepository>,
) -> Result<HttpResponse, AppError> {
    let group_id = path.into_inner();
    let group = groups
        .find_by_id(group_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("group {}", group_id)))?;

    Ok(HttpResponse::Ok().json(group))
}

/// PUT /api/groups/{id}
pub async fn update_group(
    path: web::Path<i64>,
    form: web::Json<GroupRequest>,
    groups: web::Data<dyn GroupRepository>,
) -> Result<HttpResponse, AppError> {
    let name = is_valid_name("name", &required("name", form.into_inner().name)?)?;

    let group = groups.update(path.into_inner(), &name).await?;
    Ok(HttpResponse::Ok().json(group))
}

/// DELETE /api/groups/{id}
///
/// Memberships and shares of the group go with it.
pub async fn delete_group(
    path: web::Path<i64>,
    groups: web::Data<dyn GroupRepository>,
) -> Result<HttpResponse, AppError> {
    groups.delete(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/groups/{id}/users
///
/// # Errors
/// - 404: group or user does not exist
/// - 409: already a member
pub async fn add_group_member(
    path: web::Path<i64>,
    form: web::Json<AddMemberRequest>,
    caller: AuthenticatedUser,
    memberships: web::Data<dyn MembershipRepository>,
) -> Result<HttpResponse, AppError> {
    let group_id = path.into_inner();
    let user_id = required("user_id", form.into_inner().user_id)?;
    let context = ErrorContext::new("add_group_member").with_user_id(caller.user_id);

    let membership = memberships
        .add_member(group_id, user_id)
        .await
        .map_err(|e| context.log_error(e))?;

    Ok(HttpResponse::Created().json(membership))
}

/// GET /api/groups/{id}/users
pub async fn list_group_members(
    path: web::Path<i64>,
    memberships: web::Data<dyn MembershipRepository>,
) -> Result<HttpResponse, AppError> {
    let members: Vec<UserResponse> = memberships
        .list_members_of(path.into_inner())
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(members))
}

/// DELETE /api/groups/{id}/users/{user_id}
pub async fn remove_group_member(
    path: web::Path<(i64, i64)>,
    memberships: web::Data<dyn MembershipRepository>,
) -> Result<HttpResponse, AppError> {
    let (group_id, user_id) = path.into_inner();
    memberships.remove_member(group_id, user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/groups/{id}/locations
///
/// `is_visible_coordinates` defaults to true when omitted.
///
/// # Errors
/// - 403: caller does not own the location
/// - 404: group or location does not exist
/// - 409: already shared with this group
pub async fn share_location(
    path: web::Path<i64>,
    form: web::Json<ShareLocationRequest>,
    caller: AuthenticatedUser,
    locations: web::Data<dyn LocationRepository>,
    shares: web::Data<dyn ShareRepository>,
) -> Result<HttpResponse, AppError> {
    let group_id = path.into_inner();
    let form = form.into_inner();
    let location_id = required("location_id", form.location_id)?;
    let context = ErrorContext::new("share_location").with_user_id(caller.user_id);

    let location = find_location(locations.get_ref(), location_id).await?;
    caller.ensure_is(location.user_id)?;

    let share = shares
        .share_location(group_id, location_id, form.is_visible_coordinates)
        .await
        .map_err(|e| context.log_error(e))?;

    Ok(HttpResponse::Created().json(share))
}

/// GET /api/groups/{id}/locations
///
/// Coordinates of hidden shares come back as null, except to the owner.
pub async fn list_group_locations(
    path: web::Path<i64>,
    caller: AuthenticatedUser,
    shares: web::Data<dyn ShareRepository>,
) -> Result<HttpResponse, AppError> {
    let shared: Vec<SharedLocation> = shares
        .list_locations_of(path.into_inner())
        .await?
        .into_iter()
        .map(|location| location.redacted_for(caller.user_id))
        .collect();

    Ok(HttpResponse::Ok().json(shared))
}

/// PUT /api/groups/{id}/locations/{location_id}
pub async fn update_share_visibility(
    path: web::Path<(i64, i64)>,
    form: web::Json<ShareVisibilityRequest>,
    caller: AuthenticatedUser,
    locations: web::Data<dyn LocationRepository>,
    shares: web::Data<dyn ShareRepository>,
) -> Result<HttpResponse, AppError> {
    let (group_id, location_id) = path.into_inner();
    let is_visible = required("is_visible_coordinates", form.into_inner().is_visible_coordinates)?;

    let location = find_location(locations.get_ref(), location_id).await?;
    caller.ensure_is(location.user_id)?;

    let share = shares
        .update_share_visibility(group_id, location_id, is_visible)
        .await?;
    Ok(HttpResponse::Ok().json(share))
}

/// DELETE /api/groups/{id}/locations/{location_id}
pub async fn unshare_location(
    path: web::Path<(i64, i64)>,
    caller: AuthenticatedUser,
    locations: web::Data<dyn LocationRepository>,
    shares: web::Data<dyn ShareRepository>,
) -> Result<HttpResponse, AppError> {
    let (group_id, location_id) = path.into_inner();

    let location = find_location(locations.get_ref(), location_id).await?;
    caller.ensure_is(location.user_id)?;

    shares.unshare_location(group_id, location_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
