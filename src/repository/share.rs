use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::ShareRepository;
use crate::error::{constraint_violation, AppError, ConstraintViolation};
use crate::models::{Group, GroupLocationShare, SharedLocation};

pub struct SqliteShareRepository {
    pool: SqlitePool,
}

impl SqliteShareRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShareRepository for SqliteShareRepository {
    async fn share_location(
        &self,
        group_id: i64,
        location_id: i64,
        is_visible_coordinates: bool,
    ) -> Result<GroupLocationShare, AppError> {
        let shared_at = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO group_locations (group_id, location_id, is_visible_coordinates, shared_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(group_id)
        .bind(location_id)
        .bind(is_visible_coordinates)
        .bind(shared_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match constraint_violation(&e) {
            Some(ConstraintViolation::Unique) => AppError::conflict(format!(
                "location {} is already shared with group {}",
                location_id, group_id
            )),
            Some(ConstraintViolation::ForeignKey) => {
                AppError::not_found(format!("group {} or location {}", group_id, location_id))
            }
            None => e.into(),
        })?;

        tracing::info!(
            group_id = %group_id,
            location_id = %location_id,
            is_visible_coordinates = is_visible_coordinates,
            "Location shared with group"
        );
        Ok(GroupLocationShare {
            group_id,
            location_id,
            is_visible_coordinates,
            shared_at,
        })
    }

    async fn update_share_visibility(
        &self,
        group_id: i64,
        location_id: i64,
        is_visible_coordinates: bool,
    ) -> Result<GroupLocationShare, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE group_locations SET is_visible_coordinates = ?
            WHERE group_id = ? AND location_id = ?
            "#,
        )
        .bind(is_visible_coordinates)
        .bind(group_id)
        .bind(location_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "location {} is not shared with group {}",
                location_id, group_id
            )));
        }

        let share = sqlx::query_as::<_, GroupLocationShare>(
            r#"
            SELECT group_id, location_id, is_visible_coordinates, shared_at
            FROM group_locations
            WHERE group_id = ? AND location_id = ?
            "#,
        )
        .bind(group_id)
        .bind(location_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(share)
    }

    async fn unshare_location(&self, group_id: i64, location_id: i64) -> Result<(), AppError> {
        let result =
            sqlx::query("DELETE FROM group_locations WHERE group_id = ? AND location_id = ?")
                .bind(group_id)
                .bind(location_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() > 0 {
            tracing::info!(group_id = %group_id, location_id = %location_id, "Location unshared");
        }
        Ok(())
    }

    async fn list_locations_of(&self, group_id: i64) -> Result<Vec<SharedLocation>, AppError> {
        let locations = sqlx::query_as::<_, SharedLocation>(
            r#"
            SELECT l.id AS location_id, l.user_id, l.name, l.latitude, l.longitude,
                   gl.is_visible_coordinates, gl.shared_at
            FROM locations l
            JOIN group_locations gl ON gl.location_id = l.id
            WHERE gl.group_id = ?
            ORDER BY l.id
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(locations)
    }

    async fn list_groups_sharing(&self, location_id: i64) -> Result<Vec<Group>, AppError> {
        let groups = sqlx::query_as::<_, Group>(
            r#"
            SELECT g.id, g.name, g.created_at, g.updated_at
            FROM groups g
            JOIN group_locations gl ON gl.group_id = g.id
            WHERE gl.location_id = ?
            ORDER BY g.id
            "#,
        )
        .bind(location_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn is_visibly_shared(&self, location_id: i64) -> Result<bool, AppError> {
        let (visible,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM group_locations
                WHERE location_id = ? AND is_visible_coordinates = 1
            )
            "#,
        )
        .bind(location_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(visible)
    }

    async fn visibly_shared_location_ids(&self) -> Result<HashSet<i64>, AppError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT DISTINCT location_id FROM group_locations WHERE is_visible_coordinates = 1",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
