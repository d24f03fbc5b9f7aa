/// Domain records
///
/// Rows as stored by the repositories. Response DTOs live next to the routes
/// so the password hash never reaches a serializer.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for `UserRepository::create`; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
}

/// Partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Group {
    #[serde(rename = "group_id")]
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Location {
    #[serde(rename = "location_id")]
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A location as returned to someone who may not be allowed its coordinates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationView {
    pub location_id: i64,
    pub user_id: i64,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    /// Keep the coordinates only for the owner, or when some group shares
    /// them visibly
    pub fn view_for(self, viewer_id: i64, visibly_shared: bool) -> LocationView {
        let show = self.user_id == viewer_id || visibly_shared;
        LocationView {
            location_id: self.id,
            user_id: self.user_id,
            name: self.name,
            latitude: show.then_some(self.latitude),
            longitude: show.then_some(self.longitude),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewLocation {
    pub user_id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default)]
pub struct LocationChanges {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Join row between a group and a user
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct GroupMembership {
    pub group_id: i64,
    pub user_id: i64,
    pub joined_at: DateTime<Utc>,
}

/// Join row between a group and a location
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct GroupLocationShare {
    pub group_id: i64,
    pub location_id: i64,
    pub is_visible_coordinates: bool,
    pub shared_at: DateTime<Utc>,
}

/// A location as seen through one group's share
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SharedLocation {
    pub location_id: i64,
    pub user_id: i64,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_visible_coordinates: bool,
    pub shared_at: DateTime<Utc>,
}

impl SharedLocation {
    /// Drop the coordinates unless the share exposes them or `viewer_id` owns the location
    pub fn redacted_for(mut self, viewer_id: i64) -> Self {
        if !self.is_visible_coordinates && self.user_id != viewer_id {
            self.latitude = None;
            self.longitude = None;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared(visible: bool) -> SharedLocation {
        SharedLocation {
            location_id: 7,
            user_id: 1,
            name: "Home".to_string(),
            latitude: Some(48.85),
            longitude: Some(2.35),
            is_visible_coordinates: visible,
            shared_at: Utc::now(),
        }
    }

    #[test]
    fn test_hidden_coordinates_redacted_for_other_members() {
        let view = shared(false).redacted_for(2);
        assert_eq!(view.latitude, None);
        assert_eq!(view.longitude, None);
        assert_eq!(view.name, "Home");
    }

    #[test]
    fn test_owner_always_sees_coordinates() {
        let view = shared(false).redacted_for(1);
        assert_eq!(view.latitude, Some(48.85));
    }

    #[test]
    fn test_visible_coordinates_untouched() {
        let view = shared(true).redacted_for(2);
        assert_eq!(view.longitude, Some(2.35));
    }

    #[test]
    fn test_hidden_coordinates_serialize_as_null() {
        let json = serde_json::to_value(shared(false).redacted_for(2)).unwrap();
        assert!(json["latitude"].is_null());
        assert_eq!(json["is_visible_coordinates"], false);
    }

    fn location() -> Location {
        Location {
            id: 7,
            user_id: 1,
            name: "Home".to_string(),
            latitude: 48.85,
            longitude: 2.35,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_location_view_hides_coordinates_from_strangers() {
        let view = location().view_for(2, false);
        assert_eq!(view.latitude, None);
        assert_eq!(view.longitude, None);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["location_id"], 7);
        assert!(json["latitude"].is_null());
    }

    #[test]
    fn test_location_view_for_owner_or_visible_share() {
        assert_eq!(location().view_for(1, false).latitude, Some(48.85));
        assert_eq!(location().view_for(2, true).longitude, Some(2.35));
    }
}
