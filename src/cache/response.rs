// TTL response cache.
// Serves fresh entries, lazily purges expired ones, and fronts a fetcher for misses.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::error::Result;

use super::clock::{Clock, SystemClock};
use super::key::CacheKey;
use super::store::{CacheEntry, CacheStore, DEFAULT_TTL, MemoryStore};

/// Where a payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Network,
}

/// Response cache applying TTL semantics over a [`CacheStore`].
///
/// Cloning is cheap and clones share the same store.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            default_ttl: DEFAULT_TTL,
        }
    }

    /// Cache backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Number of stored entries, expired ones included until they are looked up.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Fresh payload for `key`, if any. Expired entries are removed.
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        let entry = self.store.load(key)?;

        if entry.is_expired(self.clock.now()) {
            debug!(key = %key, "cache entry expired");
            self.store.remove(key);
            return None;
        }

        Some(entry.payload)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.get(key).is_some()
    }

    /// Store a payload, replacing any previous entry. `None` uses the default TTL.
    pub fn insert(&self, key: CacheKey, payload: Value, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let entry = CacheEntry::new(key, payload, self.clock.now(), ttl);
        self.store.save(entry);
    }

    pub fn remove(&self, key: &CacheKey) {
        self.store.remove(key);
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    /// Serve `key` from cache, or run `fetch` and cache its result.
    ///
    /// With `force_refresh` the cache is not consulted but a successful fetch
    /// still replaces the entry. Failed fetches leave the cache untouched.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &CacheKey,
        force_refresh: bool,
        ttl: Option<Duration>,
        fetch: F,
    ) -> Result<(Value, Origin)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        if !force_refresh {
            if let Some(payload) = self.get(key) {
                debug!(key = %key, "cache hit");
                return Ok((payload, Origin::Cache));
            }
            debug!(key = %key, "cache miss");
        }

        let payload = fetch().await?;
        self.insert(key.clone(), payload.clone(), ttl);
        Ok((payload, Origin::Network))
    }
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.store.len())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Params;
    use crate::cache::clock::ManualClock;
    use crate::error::ApiError;
    use chrono::Utc;
    use serde_json::json;

    fn key(endpoint: &str) -> CacheKey {
        CacheKey::new(endpoint, &Params::new())
    }

    fn cache_with_clock() -> (ResponseCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = ResponseCache::in_memory().with_clock(clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_insert_and_get() {
        let (cache, _clock) = cache_with_clock();
        cache.insert(key("/featured"), json!([1, 2]), None);

        assert_eq!(cache.get(&key("/featured")), Some(json!([1, 2])));
        assert!(cache.contains(&key("/featured")));
    }

    #[test]
    fn test_expired_entry_is_purged_on_lookup() {
        let (cache, clock) = cache_with_clock();
        cache.insert(key("/featured"), json!("A"), None);
        assert_eq!(cache.len(), 1);

        clock.advance(Duration::from_secs(301));

        assert!(cache.get(&key("/featured")).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_per_entry_ttl_overrides_default() {
        let (cache, clock) = cache_with_clock();
        cache.insert(key("/banner"), json!("short"), Some(Duration::from_secs(10)));
        cache.insert(key("/categories"), json!("long"), None);

        clock.advance(Duration::from_secs(11));

        assert!(cache.get(&key("/banner")).is_none());
        assert_eq!(cache.get(&key("/categories")), Some(json!("long")));
    }

    #[test]
    fn test_custom_default_ttl() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = ResponseCache::in_memory()
            .with_clock(clock.clone())
            .with_default_ttl(Duration::from_secs(60));
        cache.insert(key("/featured"), json!(1), None);

        clock.advance(Duration::from_secs(61));
        assert!(!cache.contains(&key("/featured")));
    }

    #[test]
    fn test_remove_and_clear() {
        let (cache, _clock) = cache_with_clock();
        cache.insert(key("/a"), json!(1), None);
        cache.insert(key("/b"), json!(2), None);

        cache.remove(&key("/a"));
        assert!(!cache.contains(&key("/a")));
        assert!(cache.contains(&key("/b")));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_get_or_fetch_hits_cache_second_time() {
        let (cache, _clock) = cache_with_clock();
        let mut fetches = 0;

        let (first, origin) = cache
            .get_or_fetch(&key("/featured"), false, None, || {
                fetches += 1;
                async { Ok(json!({"id": 1})) }
            })
            .await
            .unwrap();
        assert_eq!(origin, Origin::Network);

        let (second, origin) = cache
            .get_or_fetch(&key("/featured"), false, None, || {
                fetches += 1;
                async { Ok(json!({"id": 2})) }
            })
            .await
            .unwrap();
        assert_eq!(origin, Origin::Cache);
        assert_eq!(first, second);
        assert_eq!(fetches, 1);
    }

    #[tokio::test]
    async fn test_get_or_fetch_force_refresh_overwrites() {
        let (cache, _clock) = cache_with_clock();
        cache.insert(key("/featured"), json!("old"), None);

        let (payload, origin) = cache
            .get_or_fetch(&key("/featured"), true, None, || async { Ok(json!("new")) })
            .await
            .unwrap();

        assert_eq!(origin, Origin::Network);
        assert_eq!(payload, json!("new"));
        assert_eq!(cache.get(&key("/featured")), Some(json!("new")));
    }

    #[tokio::test]
    async fn test_failed_fetch_does_not_touch_cache() {
        let (cache, _clock) = cache_with_clock();
        cache.insert(key("/featured"), json!("old"), None);

        let result = cache
            .get_or_fetch(&key("/featured"), true, None, || async {
                Err(ApiError::Other("down".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(cache.get(&key("/featured")), Some(json!("old")));
    }
}
