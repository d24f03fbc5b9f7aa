use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::GroupRepository;
use crate::error::AppError;
use crate::models::Group;

pub struct SqliteGroupRepository {
    pool: SqlitePool,
}

impl SqliteGroupRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRepository for SqliteGroupRepository {
    async fn create(&self, name: &str) -> Result<Group, AppError> {
        let now = Utc::now();
        let id = sqlx::query("INSERT INTO groups (name, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        tracing::info!(group_id = %id, "Group created");
        Ok(Group {
            id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Group>, AppError> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, name, created_at, updated_at FROM groups WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    async fn list(&self) -> Result<Vec<Group>, AppError> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT id, name, created_at, updated_at FROM groups ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn update(&self, id: i64, name: &str) -> Result<Group, AppError> {
        let result = sqlx::query("UPDATE groups SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("group {}", id)));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("group {}", id)))
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM groups WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("group {}", id)));
        }

        tracing::info!(group_id = %id, "Group deleted");
        Ok(())
    }
}
