use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::UserRepository;
use crate::error::{constraint_violation, AppError, AuthError, ConstraintViolation};
use crate::models::{NewUser, User, UserChanges};

const USER_COLUMNS: &str = "id, email, username, password_hash, created_at, updated_at";

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

/// Unique violations on `users` always mean a taken email or username
fn map_identity_error(err: sqlx::Error) -> AppError {
    match constraint_violation(&err) {
        Some(ConstraintViolation::Unique) => AppError::Auth(AuthError::DuplicateIdentity),
        _ => err.into(),
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User, AppError> {
        let now = Utc::now();
        let id = sqlx::query(
            r#"
            INSERT INTO users (email, username, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_identity_error)?
        .last_insert_rowid();

        Ok(User {
            id,
            email: user.email.clone(),
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.fetch_one_by("email", email).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        self.fetch_one_by("username", username).await
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let query = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        let users = sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn update(&self, id: i64, changes: &UserChanges) -> Result<User, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                email = COALESCE(?, email),
                username = COALESCE(?, username),
                password_hash = COALESCE(?, password_hash),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&changes.email)
        .bind(&changes.username)
        .bind(&changes.password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_identity_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("user {}", id)));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {}", id)))
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("user {}", id)));
        }

        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }
}
