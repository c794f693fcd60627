//! Process-wide TTL map from string key to value.
//!
//! Entries are never returned once older than their TTL. Expired entries are
//! evicted lazily on the next access to that key; there is no background sweep.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use ts_rs::TS;

/// A cached value stamped with the instant it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub data: V,
    pub stored_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// Fresh while `now - stored_at <= ttl`.
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) <= self.ttl
    }
}

/// Counter snapshot for the cache admin endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CacheStats {
    pub size: usize,
    #[ts(type = "number")]
    pub hit_count: u64,
    #[ts(type = "number")]
    pub miss_count: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache, `0.0` before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the value for `key` if present and fresh.
    ///
    /// An expired entry is removed as a side effect.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries();

        match entries.get(key) {
            Some(entry) if entry.is_fresh(now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.data.clone())
            }
            Some(_) => {
                entries.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key, "evicted expired cache entry");
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store `value` under `key`, replacing any previous entry wholesale.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            data: value,
            stored_at: Instant::now(),
            ttl,
        };
        self.entries().insert(key.into(), entry);
    }

    /// Remove `key`. Returns whether an entry was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries().remove(key).is_some()
    }

    /// Remove every key starting with `prefix`, returning how many were removed.
    pub fn invalidate_by_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Drop every entry, returning how many were held.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries();
        let count = entries.len();
        entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys currently held (including expired entries not yet evicted), sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Zero the hit/miss counters. Entries are untouched.
    pub fn reset_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn fresh_entry_is_returned_until_ttl_elapses() {
        let cache = TtlCache::new();
        cache.set("pex:bonus", 7u32, MINUTE);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.get("pex:bonus"), Some(7));

        // Exactly at the TTL boundary the entry is still served.
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.get("pex:bonus"), Some(7));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get("pex:bonus"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_evicted_on_access() {
        let cache = TtlCache::new();
        cache.set("vendas:funil", "rows".to_string(), Duration::from_secs(1));
        tokio::time::advance(Duration::from_secs(2)).await;

        // Still held until someone touches it.
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("vendas:funil"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn set_restamps_the_entry() {
        let cache = TtlCache::new();
        cache.set("k", 1, Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.set("k", 2, Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get("k"), Some(2));
    }

    #[test]
    fn prefix_invalidation_respects_the_separator() {
        let cache = TtlCache::new();
        for key in ["vendas:funil", "vendas:metas", "vendas-extra", "pex:bonus"] {
            cache.set(key, (), MINUTE);
        }

        assert_eq!(cache.invalidate_by_prefix("vendas:"), 2);
        assert_eq!(cache.keys(), vec!["pex:bonus", "vendas-extra"]);
        assert_eq!(cache.invalidate_by_prefix("vendas:"), 0);
    }

    #[test]
    fn invalidate_and_clear() {
        let cache = TtlCache::new();
        cache.set("a:1", 1, MINUTE);
        cache.set("a:2", 2, MINUTE);
        cache.set("b:1", 3, MINUTE);

        assert!(cache.invalidate("a:1"));
        assert!(!cache.invalidate("a:1"));
        assert_eq!(cache.clear(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn stats_count_hits_and_misses() {
        let cache = TtlCache::new();
        cache.set("okrs:objetivos", 1, MINUTE);

        cache.get("okrs:objetivos");
        cache.get("okrs:objetivos");
        cache.get("okrs:indicadores");

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hit_count, 2);
        assert_eq!(stats.miss_count, 1);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < f64::EPSILON);

        cache.reset_stats();
        let stats = cache.stats();
        assert_eq!((stats.hit_count, stats.miss_count), (0, 0));
        assert_eq!(stats.size, 1);
    }
}
