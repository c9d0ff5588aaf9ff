use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cached payload with an absolute expiry
///
/// Serialized as the durable-tier envelope `{"payload": ..., "expiresAt": ...}`.
/// `expires_at == None` never expires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub payload: T,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl<T> CacheEntry<T> {
    pub fn new(payload: T, ttl: Option<Duration>) -> Self {
        Self {
            payload,
            expires_at: ttl.and_then(expiry_after),
        }
    }

    /// Valid only while `now` is strictly before the expiry
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }

    pub fn is_expired(&self) -> bool {
        !self.is_valid_at(Utc::now())
    }
}

/// `now + ttl`; a TTL too large to represent is treated as no expiry
fn expiry_after(ttl: Duration) -> Option<DateTime<Utc>> {
    let ttl = chrono::Duration::from_std(ttl).ok()?;
    Utc::now().checked_add_signed(ttl)
}
