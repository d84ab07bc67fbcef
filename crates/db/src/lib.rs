//! PostgreSQL connection pool factory and module migration runner.

use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use bookshelf_kernel::settings::DatabaseSettings;

pub mod migrate;

pub type DbPool = sqlx::PgPool;

/// Open a connection pool and verify the database is reachable.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_millis(settings.acquire_timeout_ms))
        .connect(&settings.url)
        .await
        .with_context(|| "failed to connect to database")?;

    tracing::info!(
        target: "bookshelf-db",
        max_connections = settings.max_connections,
        min_connections = settings.min_connections,
        "database connection pool established"
    );

    Ok(pool)
}
