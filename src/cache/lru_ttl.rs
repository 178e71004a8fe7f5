//! Bounded LRU cache with per-entry time-to-live.
//!
//! Capacity is enforced by least-recently-used eviction on insert. Expiry is
//! lazy: a stale entry is dropped when it is next looked up (or swept by a
//! prefix invalidation), never by a background task.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;

/// Cache sizing and expiry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries before LRU eviction kicks in.
    pub max_entries: NonZeroUsize,
    /// TTL applied by [`TtlLruCache::insert`].
    pub default_ttl: Duration,
}

impl CacheConfig {
    /// Creates a config; a zero `max_entries` is raised to one.
    #[must_use]
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            max_entries: NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN),
            default_ttl,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(
            crate::constants::DEFAULT_CACHE_ENTRIES,
            Duration::from_secs(crate::constants::DEFAULT_CACHE_TTL_SECS),
        )
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) > self.ttl
    }
}

/// Thread-safe LRU cache with lazy TTL expiry.
///
/// Values are returned by clone, so `V` should be cheap to clone (`Bytes`,
/// small structs). Concurrent misses on the same key may both compute and
/// insert; the last write wins.
pub struct TtlLruCache<V> {
    inner: Mutex<LruCache<String, Entry<V>>>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl<V: Clone> TtlLruCache<V> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(config.max_entries)),
            default_ttl: config.default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    /// Looks up `key`, promoting it to most-recently-used on a hit.
    ///
    /// An entry older than its TTL is evicted and reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut cache = self.inner.lock();

        let expired = match cache.peek(key) {
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            },
            Some(entry) => entry.is_expired(Instant::now()),
        };

        if expired {
            cache.pop(key);
            self.expirations.fetch_add(1, Ordering::Relaxed);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        cache.get(key).map(|entry| entry.value.clone())
    }

    /// Inserts with the default TTL.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Inserts or overwrites `key` with an explicit TTL.
    ///
    /// When the cache is full and `key` is new, the least-recently-used
    /// entry is evicted first.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            inserted_at: Instant::now(),
            ttl,
        };

        let mut cache = self.inner.lock();
        if let Some((evicted_key, _)) = cache.push(key.into(), entry) {
            // push also returns the old entry when overwriting the same key
            if !cache.contains(&evicted_key) {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Removes a single key. Returns true if it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.inner.lock().pop(key).is_some()
    }

    /// Removes every key starting with `prefix`. Returns the number removed.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut cache = self.inner.lock();
        let doomed: Vec<String> = cache
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            cache.pop(key);
        }
        doomed.len()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Number of entries currently held (including not-yet-noticed stale ones).
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        let cache = self.inner.lock();
        CacheStats {
            entries: cache.len(),
            capacity: cache.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn cache(max: usize) -> TtlLruCache<String> {
        TtlLruCache::new(CacheConfig::new(max, Duration::from_secs(60)))
    }

    #[test]
    fn test_get_after_set_hits() {
        let cache = cache(4);
        cache.insert("a", "1".to_string());
        assert_eq!(cache.get("a").as_deref(), Some("1"));
        assert!(cache.get("b").is_none());

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn test_ttl_expiry_is_lazy() {
        let cache = cache(4);
        cache.set("k", "v".to_string(), Duration::from_millis(50));
        assert_eq!(cache.get("k").as_deref(), Some("v"));

        std::thread::sleep(Duration::from_millis(100));
        // still held until looked up
        assert_eq!(cache.len(), 1);
        assert!(cache.get("k").is_none());
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_lru_eviction_order() {
        let cache = cache(3);
        cache.insert("a", "1".into());
        cache.insert("b", "2".into());
        cache.insert("c", "3".into());

        // touch "a" so "b" becomes least recently used
        assert!(cache.get("a").is_some());
        cache.insert("d", "4".into());

        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert!(cache.get("d").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let cache = cache(2);
        cache.insert("a", "1".into());
        cache.insert("b", "2".into());
        cache.insert("a", "updated".into());

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a").as_deref(), Some("updated"));
        assert!(cache.get("b").is_some());
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_invalidate_prefix_removes_all_variants() {
        let cache = cache(10);
        cache.insert("2025/10/31/a.webp-150", "s".into());
        cache.insert("2025/10/31/a.webp-300", "m".into());
        cache.insert("2025/10/31/ab.webp-300", "other".into());

        assert_eq!(cache.invalidate_prefix("2025/10/31/a.webp-"), 2);
        assert!(cache.get("2025/10/31/a.webp-150").is_none());
        assert!(cache.get("2025/10/31/a.webp-300").is_none());
        assert!(cache.get("2025/10/31/ab.webp-300").is_some());
    }

    #[test]
    fn test_zero_capacity_raised_to_one() {
        let cache = cache(0);
        cache.insert("a", "1".into());
        cache.insert("b", "2".into());
        assert_eq!(cache.len(), 1);
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn test_concurrent_access_is_consistent() {
        let cache = Arc::new(cache(64));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let key = format!("k{}", (t * 200 + i) % 100);
                        cache.insert(key.clone(), key.clone());
                        if let Some(v) = cache.get(&key) {
                            assert!(v.starts_with('k'));
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= 64);
    }
}
