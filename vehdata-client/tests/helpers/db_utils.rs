//! Database Test Utilities

use anyhow::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use vehdata_client::cache::SqliteStore;
use vehdata_common::db::{init_database, CACHE_DB_FILE};

/// Create a file-backed cache database in a temporary root folder
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let pool = init_database(&temp_dir.path().join(CACHE_DB_FILE)).await?;
    Ok((temp_dir, pool))
}

/// Private in-memory durable tier
pub async fn memory_store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::in_memory().await.unwrap())
}
