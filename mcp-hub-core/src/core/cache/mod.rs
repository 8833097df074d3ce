//! TTL memoization of expensive aggregate computations.
//! Refresh is lazy: an expired entry is recomputed by the next read, never in the background.

use crate::base::ALL_SYSTEMS;
use crate::report::TrendRange;
use crate::utils;
use lru::LruCache;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum MetricKind {
    SystemMetrics,
    SystemHealth,
    CircuitBreakers,
    PerformanceTrend(TrendRange),
    PerformanceReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey {
    /// a client name, or `all`
    pub scope: String,
    pub kind: MetricKind,
}

impl CacheKey {
    pub fn all(kind: MetricKind) -> Self {
        CacheKey {
            scope: ALL_SYSTEMS.into(),
            kind,
        }
    }

    pub fn client<S: Into<String>>(client_name: S, kind: MetricKind) -> Self {
        CacheKey {
            scope: client_name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry<V> {
    pub key: CacheKey,
    pub value: V,
    pub computed_at_ms: u64,
    pub ttl_ms: u64,
}

impl<V> CacheEntry<V> {
    #[inline]
    pub fn is_fresh_at(&self, now: u64) -> bool {
        now.saturating_sub(self.computed_at_ms) <= self.ttl_ms
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub entries: usize,
}

#[derive(Debug)]
pub struct PerformanceCache<V> {
    ttl_ms: u64,
    entries: Mutex<LruCache<CacheKey, Arc<CacheEntry<V>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> PerformanceCache<V> {
    pub fn new(ttl_ms: u64, capacity: usize) -> Self {
        PerformanceCache {
            ttl_ms,
            entries: Mutex::new(LruCache::new(capacity.max(1))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    #[inline]
    pub fn get<F>(&self, key: CacheKey, compute: F) -> Arc<CacheEntry<V>>
    where
        F: FnOnce() -> V,
    {
        self.get_at(key, utils::curr_time_millis(), compute)
    }

    /// `get_at` returns the fresh entry of `key` verbatim, or computes, stores and returns a new one.
    /// `compute` runs without the cache lock held.
    pub fn get_at<F>(&self, key: CacheKey, now: u64, compute: F) -> Arc<CacheEntry<V>>
    where
        F: FnOnce() -> V,
    {
        {
            let mut entries = utils::lock_recover(self.entries.lock());
            if let Some(entry) = entries.get(&key) {
                if entry.is_fresh_at(now) {
                    self.hits.fetch_add(1, Ordering::SeqCst);
                    return Arc::clone(entry);
                }
            }
        }
        self.misses.fetch_add(1, Ordering::SeqCst);
        let entry = Arc::new(CacheEntry {
            key: key.clone(),
            value: compute(),
            computed_at_ms: now,
            ttl_ms: self.ttl_ms,
        });
        utils::lock_recover(self.entries.lock()).put(key, Arc::clone(&entry));
        entry
    }

    /// Drop every entry. Hit and miss counts are kept.
    pub fn clear(&self) {
        utils::lock_recover(self.entries.lock()).clear();
    }

    /// Drop every entry and zero the hit and miss counts.
    pub fn reset(&self) {
        let mut entries = utils::lock_recover(self.entries.lock());
        entries.clear();
        self.hits.store(0, Ordering::SeqCst);
        self.misses.store(0, Ordering::SeqCst);
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::SeqCst);
        let misses = self.misses.load(Ordering::SeqCst);
        CacheStats {
            hits,
            misses,
            hit_rate: utils::round2(utils::percent(hits, hits + misses)),
            entries: utils::lock_recover(self.entries.lock()).len(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn fresh_entry_returned_verbatim() {
        let cache = PerformanceCache::new(5_000, 8);
        let key = CacheKey::all(MetricKind::SystemMetrics);
        let first = cache.get_at(key.clone(), 1_000, || 1);
        let second = cache.get_at(key, 6_000, || 2);
        assert_eq!(first.computed_at_ms, second.computed_at_ms);
        assert_eq!(second.value, 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn expired_entry_recomputed() {
        let cache = PerformanceCache::new(5_000, 8);
        let key = CacheKey::client("mes", MetricKind::SystemHealth);
        let computed = Cell::new(0);
        let first = cache.get_at(key.clone(), 1_000, || {
            computed.set(computed.get() + 1);
            "a"
        });
        let second = cache.get_at(key, 6_001, || {
            computed.set(computed.get() + 1);
            "b"
        });
        assert_eq!(computed.get(), 2);
        assert!(second.computed_at_ms > first.computed_at_ms);
        assert_eq!(second.value, "b");
    }

    #[test]
    fn keys_are_scoped() {
        let cache = PerformanceCache::new(5_000, 8);
        cache.get_at(CacheKey::client("mes", MetricKind::SystemMetrics), 0, || 1);
        let other = cache.get_at(CacheKey::client("erp", MetricKind::SystemMetrics), 0, || 2);
        let trend = cache.get_at(
            CacheKey::all(MetricKind::PerformanceTrend(TrendRange::OneHour)),
            0,
            || 3,
        );
        assert_eq!((other.value, trend.value), (2, 3));
        assert_eq!(cache.stats().entries, 3);
    }

    #[test]
    fn stats_and_reset() {
        let cache = PerformanceCache::new(5_000, 2);
        let key = CacheKey::all(MetricKind::CircuitBreakers);
        cache.get_at(key.clone(), 0, || 1);
        cache.get_at(key.clone(), 1, || 1);
        cache.get_at(key.clone(), 2, || 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (2, 1));
        assert_eq!(stats.hit_rate, 66.67);

        cache.clear();
        assert_eq!(cache.stats().entries, 0);
        assert_eq!(cache.stats().hits, 2);
        // capacity bounds the entries
        for scope in ["a", "b", "c"] {
            cache.get_at(CacheKey::client(scope, MetricKind::SystemMetrics), 0, || 0);
        }
        assert_eq!(cache.stats().entries, 2);

        cache.reset();
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (0, 0, 0));
        assert_eq!(stats.hit_rate, 0.0);
    }
}
