use super::CacheEntry;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Process-local cache tier
///
/// Expired entries are dropped lazily, the next time their key is read.
/// There is no background sweep.
#[derive(Debug)]
pub struct MemoryCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V: Clone> MemoryCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unexpired value for `key`
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_entry(key).map(|entry| entry.payload)
    }

    /// Unexpired entry for `key`, expiry included
    pub fn get_entry(&self, key: &str) -> Option<CacheEntry<V>> {
        {
            let entries = self.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.is_valid_at(Utc::now()) => return Some(entry.clone()),
                Some(_) => {}
            }
        }

        // Expired: purge unless another writer replaced it meanwhile
        let mut entries = self.write();
        if entries.get(key).is_some_and(|entry| entry.is_expired()) {
            entries.remove(key);
        }
        None
    }

    /// Store `value`; `ttl == None` keeps it for the life of the process
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        self.insert_entry(key, CacheEntry::new(value, ttl));
    }

    /// Store a pre-built entry, keeping its expiry
    pub fn insert_entry(&self, key: impl Into<String>, entry: CacheEntry<V>) {
        self.write().insert(key.into(), entry);
    }

    pub fn delete(&self, key: &str) -> bool {
        self.write().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Number of stored entries, including expired ones not yet read
    pub fn size(&self) -> usize {
        self.read().len()
    }

    // A panic while holding the lock cannot leave the map half-updated, so a
    // poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_set_then_get() {
        let cache = MemoryCache::new();
        cache.set("k", vec![1, 2, 3], Some(Duration::from_secs(60)));
        assert_eq!(cache.get("k"), Some(vec![1, 2, 3]));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_overwrite_does_not_double_count() {
        let cache = MemoryCache::new();
        cache.set("k", "first".to_string(), None);
        cache.set("k", "second".to_string(), None);

        assert_eq!(cache.size(), 1);
        assert_eq!(cache.get("k").as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent_and_purged() {
        let cache = MemoryCache::new();
        cache.set("k", 42u32, Some(Duration::from_millis(30)));
        assert_eq!(cache.get("k"), Some(42));

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(cache.size(), 1, "eviction is lazy");
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_delete_and_clear() {
        let cache = MemoryCache::new();
        cache.set("a", 1u8, None);
        cache.set("b", 2u8, None);

        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));
        assert_eq!(cache.size(), 1);

        cache.clear();
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn test_concurrent_writers() {
        let cache = Arc::new(MemoryCache::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        cache.set(format!("{}-{}", t, i), i, None);
                        assert_eq!(cache.get(&format!("{}-{}", t, i)), Some(i));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.size(), 800);
    }
}
