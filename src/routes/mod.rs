mod auth;
mod groups;
mod health_check;
mod locations;
mod users;

pub use auth::{current_user, login, logout, logout_all, refresh, register};
pub use groups::{
    add_group_member, create_group, delete_group, get_group, list_group_locations,
    list_group_members, list_groups, remove_group_member, share_location, unshare_location,
    update_group, update_share_visibility,
};
pub use health_check::health_check;
pub use locations::{
    create_location, delete_location, get_location, list_location_groups, list_locations,
    update_location,
};
pub use users::{delete_user, get_user, list_user_groups, list_user_locations, list_users, update_user};

use crate::error::ValidationError;

/// Unwrap a required body field, naming it in the error when absent
pub(crate) fn required<T>(field: &str, value: Option<T>) -> Result<T, ValidationError> {
    value.ok_or_else(|| ValidationError::EmptyField(field.to_string()))
}
