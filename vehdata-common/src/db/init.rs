//! Database initialization
//!
//! The durable cache tier lives in a single SQLite file under the root
//! folder. Initialization is idempotent and safe to run on every start.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// File name of the durable cache database inside the root folder
pub const CACHE_DB_FILE: &str = "vehdata-cache.db";

/// Open (creating if needed) the cache database and its schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new cache database: {}", db_path.display());
    } else {
        info!("Opened existing cache database: {}", db_path.display());
    }

    // WAL keeps readers unblocked while a write-back is in flight
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_cache_entries_table(&pool).await?;

    Ok(pool)
}

/// Create the cache_entries table
///
/// `envelope` holds the JSON `{payload, expiresAt}` document. `expires_at`
/// duplicates the expiry as unix milliseconds so expired rows can be purged
/// without parsing every envelope; NULL means no expiry.
pub async fn create_cache_entries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cache_entries (
            key TEXT PRIMARY KEY,
            envelope TEXT NOT NULL,
            expires_at INTEGER,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_cache_entries_expires_at ON cache_entries(expires_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
