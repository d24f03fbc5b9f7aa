/// Repository layer
///
/// One capability trait per aggregate, each with a SQLite implementation that
/// owns a clone of the pool. Handlers depend on the traits through
/// `web::Data<dyn Trait>`, never on the pool directly.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::{
    Group, GroupLocationShare, GroupMembership, Location, LocationChanges, NewLocation, NewUser,
    SharedLocation, User, UserChanges,
};

mod group;
mod location;
mod membership;
mod refresh_token;
mod share;
mod user;

pub use group::SqliteGroupRepository;
pub use location::SqliteLocationRepository;
pub use membership::SqliteMembershipRepository;
pub use refresh_token::SqliteRefreshTokenRepository;
pub use share::SqliteShareRepository;
pub use user::SqliteUserRepository;

/// Credential store
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; a taken email or username is `DuplicateIdentity`
    async fn create(&self, user: &NewUser) -> Result<User, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn list(&self) -> Result<Vec<User>, AppError>;

    async fn update(&self, id: i64, changes: &UserChanges) -> Result<User, AppError>;

    /// Delete a user together with their locations, memberships and refresh tokens
    async fn delete(&self, id: i64) -> Result<(), AppError>;
}

#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn create(&self, name: &str) -> Result<Group, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Group>, AppError>;

    async fn list(&self) -> Result<Vec<Group>, AppError>;

    async fn update(&self, id: i64, name: &str) -> Result<Group, AppError>;

    async fn delete(&self, id: i64) -> Result<(), AppError>;
}

#[async_trait]
pub trait LocationRepository: Send + Sync {
    /// Insert a location; an unknown owner is `NotFound`
    async fn create(&self, location: &NewLocation) -> Result<Location, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Location>, AppError>;

    async fn list(&self) -> Result<Vec<Location>, AppError>;

    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Location>, AppError>;

    async fn update(&self, id: i64, changes: &LocationChanges) -> Result<Location, AppError>;

    async fn delete(&self, id: i64) -> Result<(), AppError>;
}

/// Group <-> user associations
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// `Conflict` if already a member, `NotFound` if either side is missing
    async fn add_member(&self, group_id: i64, user_id: i64) -> Result<GroupMembership, AppError>;

    /// Removing a non-member is a no-op
    async fn remove_member(&self, group_id: i64, user_id: i64) -> Result<(), AppError>;

    async fn list_members_of(&self, group_id: i64) -> Result<Vec<User>, AppError>;

    async fn list_groups_of(&self, user_id: i64) -> Result<Vec<Group>, AppError>;
}

/// Group <-> location associations
#[async_trait]
pub trait ShareRepository: Send + Sync {
    /// `Conflict` if already shared, `NotFound` if either side is missing
    async fn share_location(
        &self,
        group_id: i64,
        location_id: i64,
        is_visible_coordinates: bool,
    ) -> Result<GroupLocationShare, AppError>;

    /// `NotFound` if the location is not shared with the group
    async fn update_share_visibility(
        &self,
        group_id: i64,
        location_id: i64,
        is_visible_coordinates: bool,
    ) -> Result<GroupLocationShare, AppError>;

    /// Unsharing a location that is not shared is a no-op
    async fn unshare_location(&self, group_id: i64, location_id: i64) -> Result<(), AppError>;

    /// Locations shared with a group, coordinates unredacted
    async fn list_locations_of(&self, group_id: i64) -> Result<Vec<SharedLocation>, AppError>;

    async fn list_groups_sharing(&self, location_id: i64) -> Result<Vec<Group>, AppError>;

    /// Whether at least one group shares the location with visible coordinates
    async fn is_visibly_shared(&self, location_id: i64) -> Result<bool, AppError>;

    /// Every location at least one group shares with visible coordinates
    async fn visibly_shared_location_ids(&self) -> Result<HashSet<i64>, AppError>;
}

/// Issued refresh tokens, stored as SHA-256 hashes
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn save(&self, user_id: i64, token_hash: &str, expires_at: i64) -> Result<(), AppError>;

    /// Mark a live token as used. Returns false if it is unknown, revoked,
    /// expired at `now` or owned by someone else.
    async fn consume(&self, user_id: i64, token_hash: &str, now: i64) -> Result<bool, AppError>;

    /// Revoke one token; unknown or already revoked tokens are ignored
    async fn revoke(&self, token_hash: &str) -> Result<(), AppError>;

    /// Revoke every live token of a user, returning how many were revoked
    async fn revoke_all_for_user(&self, user_id: i64) -> Result<u64, AppError>;
}

/// Every repository, backed by one pool
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub locations: Arc<dyn LocationRepository>,
    pub memberships: Arc<dyn MembershipRepository>,
    pub shares: Arc<dyn ShareRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
}

impl Repositories {
    pub fn sqlite(pool: SqlitePool) -> Self {
        Self {
            users: Arc::new(SqliteUserRepository::new(pool.clone())),
            groups: Arc::new(SqliteGroupRepository::new(pool.clone())),
            locations: Arc::new(SqliteLocationRepository::new(pool.clone())),
            memberships: Arc::new(SqliteMembershipRepository::new(pool.clone())),
            shares: Arc::new(SqliteShareRepository::new(pool.clone())),
            refresh_tokens: Arc::new(SqliteRefreshTokenRepository::new(pool)),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use sqlx::SqlitePool;

    /// Insert a bare user row and return its id
    pub async fn insert_user(pool: &SqlitePool, name: &str) -> i64 {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO users (email, username, password_hash, created_at, updated_at) VALUES (?, ?, 'x', ?, ?)",
        )
        .bind(format!("{}@example.com", name))
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .expect("Failed to insert user")
        .last_insert_rowid()
    }

    pub async fn insert_group(pool: &SqlitePool, name: &str) -> i64 {
        let now = Utc::now();
        sqlx::query("INSERT INTO groups (name, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await
            .expect("Failed to insert group")
            .last_insert_rowid()
    }

    pub async fn insert_location(pool: &SqlitePool, user_id: i64, name: &str) -> i64 {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO locations (user_id, name, latitude, longitude, created_at, updated_at) VALUES (?, ?, 51.5074, -0.1278, ?, ?)",
        )
        .bind(user_id)
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .expect("Failed to insert location")
        .last_insert_rowid()
    }
}
