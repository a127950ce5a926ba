//! Database initialization

use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{error, info};

use crate::Config;

/// Initialize the connection pool backing the movie and vendor repositories
///
/// Note: Migrations should be run separately by the binary crate.
pub async fn init_database(config: &Config) -> Result<PgPool> {
    let db = &config.database;
    info!(
        max_connections = db.max_connections,
        min_connections = db.min_connections,
        "Connecting to database"
    );

    let pool = PgPoolOptions::new()
        .max_connections(db.max_connections)
        .min_connections(db.min_connections)
        .acquire_timeout(Duration::from_secs(db.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(db.idle_timeout_seconds))
        .connect(config.database_url())
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            anyhow::anyhow!("Database connection failed: {}", e)
        })?;

    info!("Database connected successfully");
    Ok(pool)
}
