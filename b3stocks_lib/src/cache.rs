//! In-memory read-through cache backed by `DashMap`.
//!
//! Each entry remembers when it was fetched; whether it may still be served
//! is decided by [`CacheEntry::is_stale`] against the cache's TTL. A cache
//! built with [`MemoryCache::unbounded`] never expires entries and is only
//! emptied by [`MemoryCache::clear`].

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// A single cached value with the time it was fetched.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: String,
    pub fetched_at: Instant,
}

impl CacheEntry {
    /// Whether this entry is older than `ttl` at `now`. Without a TTL nothing is stale.
    pub fn is_stale(&self, now: Instant, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(ttl) => now.saturating_duration_since(self.fetched_at) > ttl,
            None => false,
        }
    }
}

/// Thread-safe in-memory cache with optional time-to-live expiration.
///
/// Entries are stored as serialized JSON strings. Writes are last-write-wins.
/// Stale entries are lazily evicted on the next lookup for that key.
pub struct MemoryCache {
    store: DashMap<String, CacheEntry>,
    ttl: Option<Duration>,
}

impl MemoryCache {
    /// Creates a new cache whose entries expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            store: DashMap::new(),
            ttl: Some(ttl),
        }
    }

    /// Creates a cache whose entries never expire.
    pub fn unbounded() -> Self {
        Self {
            store: DashMap::new(),
            ttl: None,
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Returns the cached value for `key`, or `None` if missing or stale.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, Instant::now())
    }

    /// Like [`get`](Self::get), evaluated at an explicit instant.
    pub fn get_at(&self, key: &str, now: Instant) -> Option<String> {
        let entry = self.store.get(key)?;
        if entry.is_stale(now, self.ttl) {
            drop(entry);
            self.store.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    /// Inserts or overwrites a cache entry, stamped with the current time.
    pub fn set(&self, key: String, value: String) {
        self.set_at(key, value, Instant::now());
    }

    /// Inserts or overwrites a cache entry fetched at `fetched_at`.
    pub fn set_at(&self, key: String, value: String, fetched_at: Instant) {
        self.store.insert(key, CacheEntry { value, fetched_at });
    }

    /// Removes a single entry.
    pub fn remove(&self, key: &str) {
        self.store.remove(key);
    }

    /// Removes all entries from the cache.
    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
