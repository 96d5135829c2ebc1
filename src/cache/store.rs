// Cache entries and the stores that hold them.
// A store only keeps entries; expiry policy lives in ResponseCache.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::key::CacheKey;

/// Default TTL for cached responses: 5 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// A cached response body with its freshness metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    /// The response body, opaque to the cache.
    pub payload: Value,
    /// When the entry was stored.
    pub stored_at: DateTime<Utc>,
    /// How long the entry stays fresh.
    pub ttl_millis: u64,
}

impl CacheEntry {
    pub fn new(key: CacheKey, payload: Value, stored_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            key,
            payload,
            stored_at,
            ttl_millis: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_millis)
    }

    /// Age of the entry at `now`. Entries stamped in the future have maximal age.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.stored_at)
            .to_std()
            .unwrap_or(Duration::MAX)
    }

    /// Check if this entry has outlived its TTL.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.age(now) > self.ttl()
    }
}

/// Storage backend for cache entries.
///
/// All operations are total: backends that can fail (disk) log the failure
/// and behave as a miss or a no-op.
pub trait CacheStore: Send + Sync {
    fn load(&self, key: &CacheKey) -> Option<CacheEntry>;

    /// Store an entry, replacing any entry under the same key.
    fn save(&self, entry: CacheEntry);

    fn remove(&self, key: &CacheKey);

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process store, lives as long as the client.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<CacheKey, CacheEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn load(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn save(&self, entry: CacheEntry) {
        self.entries.insert(entry.key.clone(), entry);
    }

    fn remove(&self, key: &CacheKey) {
        self.entries.remove(key);
    }

    fn clear(&self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Params;
    use serde_json::json;

    fn key(endpoint: &str) -> CacheKey {
        CacheKey::new(endpoint, &Params::new())
    }

    #[test]
    fn test_fresh_entry_is_not_expired() {
        let now = Utc::now();
        let entry = CacheEntry::new(key("/featured"), json!([]), now, DEFAULT_TTL);

        assert!(!entry.is_expired(now));
        assert!(!entry.is_expired(now + chrono::Duration::seconds(299)));
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let now = Utc::now();
        let mut entry = CacheEntry::new(key("/featured"), json!([]), now, DEFAULT_TTL);

        // Set stored_at to the past
        entry.stored_at = now - chrono::Duration::seconds(600);
        assert!(entry.is_expired(now));
    }

    #[test]
    fn test_entry_at_exact_ttl_is_still_fresh() {
        let now = Utc::now();
        let entry = CacheEntry::new(key("/featured"), json!(1), now, Duration::from_secs(10));
        assert!(!entry.is_expired(now + chrono::Duration::seconds(10)));
        assert!(entry.is_expired(now + chrono::Duration::milliseconds(10_001)));
    }

    #[test]
    fn test_future_timestamp_counts_as_expired() {
        let now = Utc::now();
        let entry = CacheEntry::new(
            key("/featured"),
            json!(1),
            now + chrono::Duration::hours(1),
            DEFAULT_TTL,
        );
        assert!(entry.is_expired(now));
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        let entry = CacheEntry::new(key("/categories"), json!([{"id": 1}]), Utc::now(), DEFAULT_TTL);

        store.save(entry.clone());
        assert_eq!(store.load(&key("/categories")), Some(entry));
        assert_eq!(store.len(), 1);

        store.remove(&key("/categories"));
        assert!(store.load(&key("/categories")).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_store_clear() {
        let store = MemoryStore::new();
        store.save(CacheEntry::new(key("/a"), json!(1), Utc::now(), DEFAULT_TTL));
        store.save(CacheEntry::new(key("/b"), json!(2), Utc::now(), DEFAULT_TTL));
        assert_eq!(store.len(), 2);

        store.clear();
        assert!(store.is_empty());
    }
}
