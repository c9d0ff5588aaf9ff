//! Durable, shared cache tier
//!
//! Stores opaque JSON envelopes by namespaced key. The layered cache owns the
//! envelope format; stores only persist text and an optional expiry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use vehdata_common::db::create_cache_entries_table;
use vehdata_common::Result;

#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Raw envelope for `key`, expired or not
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, envelope: &str, expires_at: Option<DateTime<Utc>>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;

    /// Remove every expired entry, returning how many were removed
    async fn purge_expired(&self) -> Result<u64>;
}

/// SQLite-backed durable tier (`cache_entries` table)
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wrap a pool whose schema was created by `vehdata_common::db::init_database`
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Private in-memory database, mostly for tests
    pub async fn in_memory() -> Result<Self> {
        // Every connection to sqlite::memory: is a separate database, so the
        // pool must hold exactly one connection for its whole life.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        create_cache_entries_table(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl DurableStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let envelope: Option<String> =
            sqlx::query_scalar("SELECT envelope FROM cache_entries WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(envelope)
    }

    async fn set(&self, key: &str, envelope: &str, expires_at: Option<DateTime<Utc>>) -> Result<()> {
        sqlx::query(
            "INSERT INTO cache_entries (key, envelope, expires_at, updated_at)
             VALUES (?, ?, ?, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET
                envelope = excluded.envelope,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(envelope)
        .bind(expires_at.map(|t| t.timestamp_millis()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM cache_entries")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at <= ?")
                .bind(Utc::now().timestamp_millis())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
