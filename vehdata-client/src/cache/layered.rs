//! Two-tier read-through cache
//!
//! Lookup order for a key is always memory, then durable store, then a live
//! fetch. A durable hit is copied back into memory. A fresh fetch is written
//! to memory before returning and to the durable store in a background task
//! whose failure is only logged.
//!
//! Concurrent misses on the same key each run their own fetch.

use super::{CacheEntry, DurableStore, MemoryCache};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

const NAMESPACE: &str = "vehdata";

/// How long a data class is cached and whether it reaches the durable tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Option<Duration>,
    pub durable: bool,
}

impl CachePolicy {
    /// Both tiers, expiring after `ttl`
    pub const fn durable(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            durable: true,
        }
    }

    /// Memory tier only, kept until the process exits or the cache is cleared
    pub const fn process_lifetime() -> Self {
        Self {
            ttl: None,
            durable: false,
        }
    }
}

pub struct LayeredCache {
    memory: MemoryCache<Value>,
    durable: Option<Arc<dyn DurableStore>>,
    /// Background durable writes not yet finished
    writes: TaskTracker,
}

impl LayeredCache {
    pub fn new(durable: Option<Arc<dyn DurableStore>>) -> Self {
        Self {
            memory: MemoryCache::new(),
            durable,
            writes: TaskTracker::new(),
        }
    }

    pub fn memory_only() -> Self {
        Self::new(None)
    }

    pub fn has_durable_tier(&self) -> bool {
        self.durable.is_some()
    }

    /// Namespaced storage key, e.g. `vehdata:recalls:jeep:cherokee:2017`
    pub fn storage_key(domain: &str, key: &str) -> String {
        format!("{}:{}:{}", NAMESPACE, domain, key)
    }

    /// Cached value for `domain`/`key`, or the result of `fetch`
    ///
    /// Errors from `fetch` propagate unchanged and nothing is cached.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        domain: &str,
        key: &str,
        policy: CachePolicy,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let storage_key = Self::storage_key(domain, key);

        if let Some(value) = self.memory.get(&storage_key) {
            match serde_json::from_value::<T>(value) {
                Ok(hit) => {
                    debug!(key = %storage_key, tier = "memory", "Cache hit");
                    return Ok(hit);
                }
                Err(e) => {
                    warn!(key = %storage_key, error = %e, "Discarding unreadable memory entry");
                    self.memory.delete(&storage_key);
                }
            }
        }

        if policy.durable {
            if let Some(hit) = self.read_durable::<T>(&storage_key).await {
                return Ok(hit);
            }
        }

        let value = fetch().await?;
        self.store(storage_key, &value, policy);
        Ok(value)
    }

    /// Durable-tier lookup; every failure is logged and reported as a miss
    async fn read_durable<T: DeserializeOwned>(&self, storage_key: &str) -> Option<T> {
        let store = self.durable.as_ref()?;

        let envelope = match store.get(storage_key).await {
            Ok(Some(envelope)) => envelope,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %storage_key, error = %e, "Durable cache read failed");
                return None;
            }
        };

        let entry: CacheEntry<Value> = match serde_json::from_str(&envelope) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %storage_key, error = %e, "Durable cache envelope unreadable");
                return None;
            }
        };

        // Expired rows are left for purge_expired or the next write-back
        if !entry.is_valid_at(Utc::now()) {
            debug!(key = %storage_key, "Durable cache entry expired");
            return None;
        }

        let hit = match serde_json::from_value::<T>(entry.payload.clone()) {
            Ok(hit) => hit,
            Err(e) => {
                warn!(key = %storage_key, error = %e, "Durable cache payload has unexpected shape");
                return None;
            }
        };

        debug!(key = %storage_key, tier = "durable", "Cache hit");
        self.memory.insert_entry(storage_key, entry);
        Some(hit)
    }

    fn store<T: Serialize>(&self, storage_key: String, value: &T, policy: CachePolicy) {
        let payload = match serde_json::to_value(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %storage_key, error = %e, "Value not cacheable");
                return;
            }
        };

        let entry = CacheEntry::new(payload, policy.ttl);

        if policy.durable {
            if let Some(store) = &self.durable {
                match serde_json::to_string(&entry) {
                    Ok(envelope) => {
                        let store = Arc::clone(store);
                        let key = storage_key.clone();
                        let expires_at = entry.expires_at;
                        self.writes.spawn(async move {
                            if let Err(e) = store.set(&key, &envelope, expires_at).await {
                                warn!(key = %key, error = %e, "Durable cache write failed");
                            }
                        });
                    }
                    Err(e) => warn!(key = %storage_key, error = %e, "Envelope serialization failed"),
                }
            }
        }

        self.memory.insert_entry(storage_key, entry);
    }

    /// Wait for every background durable write started so far
    pub async fn flush(&self) {
        self.writes.close();
        self.writes.wait().await;
        self.writes.reopen();
    }

    /// Empty both tiers
    ///
    /// Writes already started are flushed first. Clearing is not atomic with
    /// lookups still in flight: a fetch that completes after the flush can
    /// repopulate either tier once the clear returns.
    pub async fn clear(&self) {
        self.flush().await;
        self.memory.clear();
        if let Some(store) = &self.durable {
            if let Err(e) = store.clear().await {
                warn!(error = %e, "Durable cache clear failed");
            }
        }
    }

    /// Remove expired rows from the durable tier
    pub async fn purge_expired(&self) -> u64 {
        let Some(store) = &self.durable else {
            return 0;
        };
        match store.purge_expired().await {
            Ok(purged) => purged,
            Err(e) => {
                warn!(error = %e, "Durable cache purge failed");
                0
            }
        }
    }

    /// Entries currently held in the memory tier
    pub fn memory_size(&self) -> usize {
        self.memory.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SqliteStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_fetch_once_then_memory_hit() {
        let cache = LayeredCache::memory_only();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: Result<u32, ()> = cache
                .get_or_fetch("test", "k", CachePolicy::process_lifetime(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(5)
                })
                .await;
            assert_eq!(value, Ok(5));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.memory_size(), 1);
    }

    #[tokio::test]
    async fn test_fetch_error_is_not_cached() {
        let cache = LayeredCache::memory_only();

        let first: Result<u32, &str> = cache
            .get_or_fetch("test", "k", CachePolicy::process_lifetime(), || async { Err("down") })
            .await;
        assert_eq!(first, Err("down"));
        assert_eq!(cache.memory_size(), 0);

        let second: Result<u32, &str> = cache
            .get_or_fetch("test", "k", CachePolicy::process_lifetime(), || async { Ok(1) })
            .await;
        assert_eq!(second, Ok(1));
    }

    #[tokio::test]
    async fn test_durable_hit_backfills_memory() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let envelope = serde_json::to_string(&CacheEntry::new(
            serde_json::json!("from-durable"),
            Some(Duration::from_secs(60)),
        ))
        .unwrap();
        store
            .set(&LayeredCache::storage_key("test", "k"), &envelope, None)
            .await
            .unwrap();

        let durable: Arc<dyn DurableStore> = store;
        let cache = LayeredCache::new(Some(durable));
        let value: Result<String, ()> = cache
            .get_or_fetch("test", "k", CachePolicy::durable(Duration::from_secs(60)), || async {
                Ok("from-fetch".to_string())
            })
            .await;

        assert_eq!(value.unwrap(), "from-durable");
        assert_eq!(cache.memory_size(), 1);
    }

    #[tokio::test]
    async fn test_process_lifetime_policy_skips_durable_tier() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let durable: Arc<dyn DurableStore> = store.clone();
        let cache = LayeredCache::new(Some(durable));

        let _: Result<u8, ()> = cache
            .get_or_fetch("test", "k", CachePolicy::process_lifetime(), || async { Ok(1) })
            .await;
        cache.flush().await;

        let key = LayeredCache::storage_key("test", "k");
        assert_eq!(store.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_durable_row_left_for_purge() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let key = LayeredCache::storage_key("test", "k");
        let expired = chrono::Utc::now() - chrono::Duration::seconds(5);
        let envelope = serde_json::to_string(&CacheEntry {
            payload: serde_json::json!("old"),
            expires_at: Some(expired),
        })
        .unwrap();
        store.set(&key, &envelope, Some(expired)).await.unwrap();

        let durable: Arc<dyn DurableStore> = store.clone();
        let cache = LayeredCache::new(Some(durable));
        let value: Result<String, &str> = cache
            .get_or_fetch("test", "k", CachePolicy::durable(Duration::from_secs(60)), || async {
                Err("down")
            })
            .await;

        assert_eq!(value, Err("down"));
        assert!(store.get(&key).await.unwrap().is_some());
        assert_eq!(cache.purge_expired().await, 1);
    }

    #[tokio::test]
    async fn test_fresh_value_written_back_to_durable_tier() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let durable: Arc<dyn DurableStore> = store.clone();
        let cache = LayeredCache::new(Some(durable));

        let _: Result<String, ()> = cache
            .get_or_fetch("test", "k", CachePolicy::durable(Duration::from_secs(60)), || async {
                Ok("fresh".to_string())
            })
            .await;
        cache.flush().await;

        let envelope = store
            .get(&LayeredCache::storage_key("test", "k"))
            .await
            .unwrap()
            .unwrap();
        let entry: CacheEntry<String> = serde_json::from_str(&envelope).unwrap();
        assert_eq!(entry.payload, "fresh");
        assert!(entry.expires_at.is_some());
    }
}
