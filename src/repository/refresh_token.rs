use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::RefreshTokenRepository;
use crate::error::AppError;

pub struct SqliteRefreshTokenRepository {
    pool: SqlitePool,
}

impl SqliteRefreshTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for SqliteRefreshTokenRepository {
    async fn save(&self, user_id: i64, token_hash: &str, expires_at: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn consume(&self, user_id: i64, token_hash: &str, now: i64) -> Result<bool, AppError> {
        // Single statement so two concurrent refreshes cannot both succeed
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = ?
            WHERE token_hash = ? AND user_id = ? AND revoked_at IS NULL AND expires_at > ?
            "#,
        )
        .bind(Utc::now())
        .bind(token_hash)
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke(&self, token_hash: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = ? WHERE token_hash = ? AND revoked_at IS NULL",
        )
        .bind(Utc::now())
        .bind(token_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = ? WHERE user_id = ? AND revoked_at IS NULL",
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            user_id = %user_id,
            revoked = result.rows_affected(),
            "All refresh tokens revoked for user"
        );
        Ok(result.rows_affected())
    }
}
