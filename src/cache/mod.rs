//! Per-module memoization of result bags.
pub mod fingerprint;

pub use fingerprint::Fingerprint;

use crate::value::ValueBag;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub property_type: TypeId,
    pub fingerprint: Fingerprint,
}

/// Counters describing how a cache has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups > 0 { self.hits as f64 / lookups as f64 } else { 0.0 }
    }
}

/// Result cache private to one module instance.
///
/// Lookups take a read lock, so a locked module can serve concurrent callers.
/// Concurrent misses on the same key may both compute and insert; the last
/// write wins, and both writers hold the same result for the same key.
#[derive(Debug, Default)]
pub struct MemoCache {
    entries: RwLock<HashMap<CacheKey, ValueBag>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up `key`, counting the hit or miss.
    pub fn get(&self, key: &CacheKey) -> Option<ValueBag> {
        let found = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn insert(&self, key: CacheKey, results: ValueBag) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, results);
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).contains_key(key)
    }

    /// Drops every entry. The hit/miss counters are kept.
    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fingerprint::{call_fingerprint, Fingerprinter};
    use super::*;

    fn key(n: i64) -> CacheKey {
        let config = Fingerprinter::new("test").finish();
        CacheKey {
            property_type: TypeId::of::<()>(),
            fingerprint: call_fingerprint(&config, "Test", &ValueBag::new().with("n", n)),
        }
    }

    #[test]
    fn test_get_insert_and_counters() {
        let cache = MemoCache::new();
        assert!(cache.get(&key(1)).is_none());

        cache.insert(key(1), ValueBag::new().with("out", 1.0));
        assert_eq!(cache.get(&key(1)), Some(ValueBag::new().with("out", 1.0)));
        assert!(cache.get(&key(2)).is_none());

        let stats = cache.stats();
        assert_eq!(stats, CacheStats { entries: 1, hits: 1, misses: 2 });
        assert!((stats.hit_rate() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_clear_drops_entries_but_keeps_counters() {
        let cache = MemoCache::new();
        cache.insert(key(1), ValueBag::new());
        assert!(cache.get(&key(1)).is_some());

        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains(&key(1)));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_same_fingerprint_different_property_type_is_a_different_key() {
        let cache = MemoCache::new();
        let a = key(1);
        let b = CacheKey { property_type: TypeId::of::<u8>(), ..a };
        cache.insert(a, ValueBag::new().with("x", 1_i64));
        assert!(cache.get(&b).is_none());
    }
}
