/// Connection pool and schema setup
///
/// The pool built here is the only database handle in the process. It is
/// passed explicitly to every repository.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::configuration::DatabaseSettings;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a pool for `settings.url` with foreign keys enforced on every connection.
///
/// An in-memory database lives inside a single connection, so the pool is
/// pinned to one connection that is never recycled.
pub async fn connect(settings: &DatabaseSettings) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&settings.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    let pool_options = if settings.is_in_memory() {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(settings.max_connections)
    };

    let pool = pool_options.connect_with(options).await?;
    tracing::info!(url = %settings.url, "Database pool created");
    Ok(pool)
}

/// Create or upgrade the schema from the embedded migrations
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrated");
    Ok(())
}

/// Fresh, migrated in-memory database
pub async fn in_memory() -> Result<SqlitePool, sqlx::Error> {
    let pool = connect(&DatabaseSettings::in_memory()).await?;
    migrate(&pool).await?;
    Ok(pool)
}
