//! Request-collapsing loader on top of [`TtlCache`].
//!
//! On a miss, exactly one producer runs per key; concurrent callers attach to
//! the in-flight [`Shared`] future and receive the same `Ok` or `Err`. The
//! cache check, the pending-table check and the pending-slot registration all
//! happen under one lock, and settlement (cache write + slot removal) happens
//! under that same lock, so no caller can observe a settled-but-unwritten key.
//!
//! Producers run on their own task. A load settles even if every caller has
//! gone away, and a panicking producer settles as [`LoadAborted`].

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{Instrument, debug, error, info};

use super::ttl::{CacheStats, TtlCache};

/// A load that ended without its producer returning.
#[derive(Debug, Clone, thiserror::Error)]
#[error("load of '{key}' did not complete: {reason}")]
pub struct LoadAborted {
    pub key: String,
    pub reason: String,
}

impl LoadAborted {
    fn new(key: &str, reason: impl Into<String>) -> Self {
        Self {
            key: key.to_owned(),
            reason: reason.into(),
        }
    }
}

type SharedLoad<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

struct PendingRequest<V, E> {
    generation: u64,
    load: SharedLoad<V, E>,
}

struct Inner<V, E> {
    cache: TtlCache<V>,
    /// key → in-flight load. Lock order: `pending` before the cache map.
    pending: Mutex<HashMap<String, PendingRequest<V, E>>>,
    next_generation: AtomicU64,
    producer_calls: AtomicU64,
    joined_calls: AtomicU64,
}

impl<V, E> Inner<V, E>
where
    V: Clone,
{
    fn pending(&self) -> MutexGuard<'_, HashMap<String, PendingRequest<V, E>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the outcome of the load registered as `generation`.
    ///
    /// The cache is only written if the slot is still ours; an invalidation
    /// that ran while the producer was in flight removes the slot, and the
    /// now-outdated result is handed to waiters without being cached.
    fn settle(&self, key: &str, generation: u64, ttl: Duration, result: &Result<V, E>) {
        let mut pending = self.pending();
        let owned = pending
            .get(key)
            .is_some_and(|slot| slot.generation == generation);
        if !owned {
            debug!(key, generation, "load settled after invalidation, result not cached");
            return;
        }
        pending.remove(key);
        match result {
            Ok(value) => {
                self.cache.set(key, value.clone(), ttl);
                debug!(key, generation, "load settled, cache populated");
            }
            Err(_) => {
                debug!(key, generation, "load failed, cache left untouched");
            }
        }
    }
}

/// Snapshot of loader and cache counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoaderStats {
    pub cache: CacheStats,
    pub pending: usize,
    pub producer_calls: u64,
    pub joined_calls: u64,
}

/// Shared, clone-cheap cache front for a remote data source.
pub struct DedupingLoader<V, E> {
    inner: Arc<Inner<V, E>>,
}

impl<V, E> Clone for DedupingLoader<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, E> Default for DedupingLoader<V, E>
where
    V: Clone,
{
    fn default() -> Self {
        Self {
            inner: Arc::new(Inner {
                cache: TtlCache::new(),
                pending: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                producer_calls: AtomicU64::new(0),
                joined_calls: AtomicU64::new(0),
            }),
        }
    }
}

impl<V, E> DedupingLoader<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<LoadAborted> + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying TTL map, for direct reads and writes.
    ///
    /// Invalidation should go through the loader so in-flight loads for the
    /// same keys are detached as well.
    pub fn cache(&self) -> &TtlCache<V> {
        &self.inner.cache
    }

    /// Return the cached value for `key`, or run `producer` once for all
    /// concurrent callers and cache its success for `ttl`.
    ///
    /// A failing producer leaves the cache untouched and its error is returned
    /// to every attached caller.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, ttl: Duration, producer: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        Ok(self.load(key, ttl, producer).await?.0)
    }

    /// Like [`get_or_fetch`](Self::get_or_fetch), also reporting whether the
    /// value came straight from the cache (`true`) or from a load (`false`).
    pub async fn load<F, Fut>(&self, key: &str, ttl: Duration, producer: F) -> Result<(V, bool), E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let load = {
            let mut pending = self.inner.pending();

            if let Some(value) = self.inner.cache.get(key) {
                debug!(key, "cache hit");
                return Ok((value, true));
            }

            if let Some(existing) = pending.get(key) {
                self.inner.joined_calls.fetch_add(1, Ordering::Relaxed);
                debug!(key, generation = existing.generation, "joined in-flight load");
                existing.load.clone()
            } else {
                let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
                self.inner.producer_calls.fetch_add(1, Ordering::Relaxed);
                info!(key, generation, ttl = ?ttl, "cache miss, invoking producer");

                let inner = Arc::clone(&self.inner);
                let owned_key = key.to_owned();
                let task = tokio::spawn(
                    async move {
                        let result = AssertUnwindSafe(async move { producer().await })
                            .catch_unwind()
                            .await
                            .unwrap_or_else(|_| {
                                error!(key = %owned_key, generation, "producer panicked");
                                Err(LoadAborted::new(&owned_key, "producer panicked").into())
                            });
                        inner.settle(&owned_key, generation, ttl, &result);
                        result
                    }
                    .in_current_span(),
                );

                let task_key = key.to_owned();
                let load = async move {
                    task.await.unwrap_or_else(|err| {
                        Err(LoadAborted::new(&task_key, err.to_string()).into())
                    })
                }
                .boxed()
                .shared();

                pending.insert(
                    key.to_owned(),
                    PendingRequest {
                        generation,
                        load: load.clone(),
                    },
                );
                load
            }
        };

        load.await.map(|value| (value, false))
    }

    /// Remove `key` from the cache and detach any in-flight load for it.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut pending = self.inner.pending();
        let detached = pending.remove(key).is_some();
        let removed = self.inner.cache.invalidate(key);
        info!(key, removed, detached, "cache key invalidated");
        removed
    }

    /// Remove every key starting with `prefix`, returning how many cache
    /// entries were removed. In-flight loads under the prefix are detached.
    pub fn invalidate_by_prefix(&self, prefix: &str) -> usize {
        let mut pending = self.inner.pending();
        pending.retain(|key, _| !key.starts_with(prefix));
        let removed = self.inner.cache.invalidate_by_prefix(prefix);
        info!(prefix, removed, "cache prefix invalidated");
        removed
    }

    /// Drop every entry and detach every in-flight load.
    pub fn clear(&self) -> usize {
        let mut pending = self.inner.pending();
        pending.clear();
        let removed = self.inner.cache.clear();
        info!(removed, "cache cleared");
        removed
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending().len()
    }

    pub fn stats(&self) -> LoaderStats {
        LoaderStats {
            cache: self.inner.cache.stats(),
            pending: self.pending_count(),
            producer_calls: self.inner.producer_calls.load(Ordering::Relaxed),
            joined_calls: self.inner.joined_calls.load(Ordering::Relaxed),
        }
    }

    /// Zero every counter, cache hit/miss included.
    pub fn reset_stats(&self) {
        self.inner.cache.reset_stats();
        self.inner.producer_calls.store(0, Ordering::Relaxed);
        self.inner.joined_calls.store(0, Ordering::Relaxed);
    }
}
