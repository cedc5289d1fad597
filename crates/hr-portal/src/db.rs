//! SQLite pool bootstrap and schema migrations.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::config::DatabaseConfig;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("invalid DATABASE_URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("unable to open database: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Open a pool against the configured database, creating the file when missing.
///
/// Foreign keys are enforced on every pooled connection so the schema's
/// cascade rule stays active.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, DatabaseError> {
    info!(url = %config.url, "opening database");

    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|source| DatabaseError::InvalidUrl {
            url: config.url.clone(),
            source,
        })?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .connect_with(options)
        .await
        .map_err(DatabaseError::Connect)
}

/// Single-connection in-memory database; the connection is never recycled
/// so the schema lives as long as the pool.
pub async fn connect_in_memory() -> Result<SqlitePool, DatabaseError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|source| DatabaseError::InvalidUrl {
            url: "sqlite::memory:".to_string(),
            source,
        })?
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(DatabaseError::Connect)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), DatabaseError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("database schema up to date");
    Ok(())
}
