use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::LocationRepository;
use crate::error::{constraint_violation, AppError, ConstraintViolation};
use crate::models::{Location, LocationChanges, NewLocation};

const LOCATION_COLUMNS: &str = "id, user_id, name, latitude, longitude, created_at, updated_at";

pub struct SqliteLocationRepository {
    pool: SqlitePool,
}

impl SqliteLocationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationRepository for SqliteLocationRepository {
    async fn create(&self, location: &NewLocation) -> Result<Location, AppError> {
        let now = Utc::now();
        let id = sqlx::query(
            r#"
            INSERT INTO locations (user_id, name, latitude, longitude, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(location.user_id)
        .bind(&location.name)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match constraint_violation(&e) {
            Some(ConstraintViolation::ForeignKey) => {
                AppError::not_found(format!("user {}", location.user_id))
            }
            _ => e.into(),
        })?
        .last_insert_rowid();

        tracing::info!(location_id = %id, user_id = %location.user_id, "Location created");
        Ok(Location {
            id,
            user_id: location.user_id,
            name: location.name.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Location>, AppError> {
        let query = format!("SELECT {} FROM locations WHERE id = ?", LOCATION_COLUMNS);
        let location = sqlx::query_as::<_, Location>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(location)
    }

    async fn list(&self) -> Result<Vec<Location>, AppError> {
        let query = format!("SELECT {} FROM locations ORDER BY id", LOCATION_COLUMNS);
        let locations = sqlx::query_as::<_, Location>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(locations)
    }

    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Location>, AppError> {
        let query = format!(
            "SELECT {} FROM locations WHERE user_id = ? ORDER BY id",
            LOCATION_COLUMNS
        );
        let locations = sqlx::query_as::<_, Location>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(locations)
    }

    async fn update(&self, id: i64, changes: &LocationChanges) -> Result<Location, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE locations SET
                name = COALESCE(?, name),
                latitude = COALESCE(?, latitude),
                longitude = COALESCE(?, longitude),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&changes.name)
        .bind(changes.latitude)
        .bind(changes.longitude)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("location {}", id)));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("location {}", id)))
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM locations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("location {}", id)));
        }

        tracing::info!(location_id = %id, "Location deleted");
        Ok(())
    }
}
