use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use lru::LruCache;

/// Hit/miss counters of a [`BoundedCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    /// Lookups that found an entry.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Entries currently stored.
    pub len: usize,
    /// Maximum number of entries; 0 means caching is disabled.
    pub capacity: usize,
}

/// Thread-safe LRU map bounded by entry count.
///
/// `get` refreshes recency; inserting into a full cache evicts the least recently used entry.
/// A capacity of 0 disables the cache: inserts are dropped and lookups miss.
pub struct BoundedCache<K: Hash + Eq, V> {
    inner: Option<Mutex<LruCache<K, V>>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K: Hash + Eq, V: Clone> BoundedCache<K, V> {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> Option<MutexGuard<'_, LruCache<K, V>>> {
        self.inner
            .as_ref()
            .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Look up `key`, marking it most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let found = self.lock().and_then(|mut c| c.get(key).cloned());
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Whether `key` is present, without touching recency.
    pub fn contains(&self, key: &K) -> bool {
        self.lock().is_some_and(|c| c.contains(key))
    }

    /// Insert or replace `key`.
    pub fn insert(&self, key: K, value: V) {
        // Evicted values drop after the lock is released.
        let evicted = self.lock().and_then(|mut c| c.push(key, value));
        drop(evicted);
    }

    /// Remove every entry.
    pub fn clear(&self) {
        if let Some(mut c) = self.lock() {
            c.clear();
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.lock().map_or(0, |c| c.len())
    }

    /// `true` when no entry is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: self.len(),
            capacity: self.capacity,
        }
    }
}

impl<K: Hash + Eq, V: Clone> std::fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCache")
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/bounded.rs"]
mod tests;
