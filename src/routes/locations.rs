/// Location Routes
///
/// Locations belong to the user who created them; only the owner may change
/// or delete one.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::required;
use crate::auth::AuthenticatedUser;
use crate::error::{AppError, ErrorContext};
use crate::models::{Location, LocationChanges, LocationView, NewLocation};
use crate::repository::{LocationRepository, ShareRepository};
use crate::validators::{is_valid_latitude, is_valid_longitude, is_valid_name};

#[derive(Deserialize)]
pub struct CreateLocationRequest {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Fetch a location or fail with 404
pub(crate) async fn find_location(
    locations: &dyn LocationRepository,
    location_id: i64,
) -> Result<Location, AppError> {
    locations
        .find_by_id(location_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("location {}", location_id)))
}

/// Redact coordinates the viewer may not see
///
/// The owner always sees them; anyone else only when some group shares the
/// location with visible coordinates.
pub(crate) async fn views_for(
    owned: Vec<Location>,
    viewer_id: i64,
    shares: &dyn ShareRepository,
) -> Result<Vec<LocationView>, AppError> {
    let visible = if owned.iter().all(|l| l.user_id == viewer_id) {
        Default::default()
    } else {
        shares.visibly_shared_location_ids().await?
    };

    Ok(owned
        .into_iter()
        .map(|l| {
            let visibly_shared = visible.contains(&l.id);
            l.view_for(viewer_id, visibly_shared)
        })
        .collect())
}

/// POST /api/locations
///
/// The caller becomes the owner.
pub async fn create_location(
    form: web::Json<CreateLocationRequest>,
    caller: AuthenticatedUser,
    locations: web::Data<dyn LocationRepository>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("create_location").with_user_id(caller.user_id);
    let form = form.into_inner();

    let new_location = NewLocation {
        user_id: caller.user_id,
        name: is_valid_name("name", &required("name", form.name)?)?,
        latitude: is_valid_latitude(required("latitude", form.latitude)?)?,
        longitude: is_valid_longitude(required("longitude", form.longitude)?)?,
    };

    let location = locations
        .create(&new_location)
        .await
        .map_err(|e| context.log_error(e))?;

    Ok(HttpResponse::Created().json(location))
}

/// GET /api/locations
///
/// Coordinates of other users' locations are null unless visibly shared.
pub async fn list_locations(
    caller: AuthenticatedUser,
    locations: web::Data<dyn LocationRepository>,
    shares: web::Data<dyn ShareRepository>,
) -> Result<HttpResponse, AppError> {
    let all = locations.list().await?;
    Ok(HttpResponse::Ok().json(views_for(all, caller.user_id, shares.get_ref()).await?))
}

/// GET /api/locations/{id}
///
/// Coordinates are null unless the caller owns the location or it is visibly
/// shared.
pub async fn get_location(
    path: web::Path<i64>,
    caller: AuthenticatedUser,
    locations: web::Data<dyn LocationRepository>,
    shares: web::Data<dyn ShareRepository>,
) -> Result<HttpResponse, AppError> {
    let location = find_location(locations.get_ref(), path.into_inner()).await?;
    let visibly_shared =
        location.user_id != caller.user_id && shares.is_visibly_shared(location.id).await?;

    Ok(HttpResponse::Ok().json(location.view_for(caller.user_id, visibly_shared)))
}

/// PUT /api/locations/{id}
///
/// # Errors
/// - 403: caller does not own the location
/// - 404: no such location
pub async fn update_location(
    path: web::Path<i64>,
    form: web::Json<UpdateLocationRequest>,
    caller: AuthenticatedUser,
    locations: web::Data<dyn LocationRepository>,
) -> Result<HttpResponse, AppError> {
    let location_id = path.into_inner();
    let form = form.into_inner();

    let changes = LocationChanges {
        name: form.name.as_deref().map(|n| is_valid_name("name", n)).transpose()?,
        latitude: form.latitude.map(is_valid_latitude).transpose()?,
        longitude: form.longitude.map(is_valid_longitude).transpose()?,
    };

    let existing = find_location(locations.get_ref(), location_id).await?;
    caller.ensure_is(existing.user_id)?;

    let location = locations.update(location_id, &changes).await?;
    Ok(HttpResponse::Ok().json(location))
}

/// DELETE /api/locations/{id}
///
/// Removes the location from every group it was shared with.
pub async fn delete_location(
    path: web::Path<i64>,
    caller: AuthenticatedUser,
    locations: web::Data<dyn LocationRepository>,
) -> Result<HttpResponse, AppError> {
    let location_id = path.into_inner();
    let existing = find_location(locations.get_ref(), location_id).await?;
    caller.ensure_is(existing.user_id)?;

    locations.delete(location_id).await?;
    tracing::info!(user_id = %caller.user_id, location_id = %location_id, "Location removed by owner");
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/locations/{id}/groups
pub async fn list_location_groups(
    path: web::Path<i64>,
    shares: web::Data<dyn ShareRepository>,
) -> Result<HttpResponse, AppError> {
    let groups = shares.list_groups_sharing(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(groups))
}
