//! TTL Cache Module
//!
//! The engine shared by the Response Cache and the Detail Cache: a keyed map of
//! timestamped entries, an optional FIFO capacity bound, and one in-flight
//! ticket per key so that concurrent callers share a single network call.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStats, FifoTracker};
use crate::clock::Clock;
use crate::error::{CacheError, Result};

/// A pending network call producing a cache payload.
pub type Fetch<V> = BoxFuture<'static, Result<V>>;

/// In-flight ticket: every waiter polls the same shared future.
type Ticket<V> = Shared<BoxFuture<'static, Result<V>>>;

struct Inner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    order: FifoTracker<K>,
    inflight: HashMap<K, (u64, Ticket<V>)>,
    stats: CacheStats,
    next_ticket: u64,
    /// Bumped by `invalidate_all`; completions from an older epoch are discarded.
    epoch: u64,
}

// == TTL Cache ==
/// Keyed TTL cache with request deduplication.
///
/// Cloning is cheap and yields a handle onto the same cache.
pub struct TtlCache<K, V> {
    name: &'static str,
    inner: Arc<Mutex<Inner<K, V>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    capacity: Option<usize>,
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            inner: Arc::clone(&self.inner),
            clock: Arc::clone(&self.clock),
            ttl: self.ttl,
            capacity: self.capacity,
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Clone + Eq + Hash + Display + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache whose entries go stale after `ttl`.
    ///
    /// # Arguments
    /// * `name` - Label used in log lines
    /// * `capacity` - FIFO ceiling on the number of entries, `None` for unbounded
    pub fn new(
        name: &'static str,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        capacity: Option<usize>,
    ) -> Self {
        Self {
            name,
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                order: FifoTracker::new(),
                inflight: HashMap::new(),
                stats: CacheStats::new(),
                next_ticket: 0,
                epoch: 0,
            })),
            clock,
            ttl,
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        // No code panics while holding the lock; recover the data if it ever does
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // == Get Or Fetch ==
    /// Returns the cached payload for `key`, or the result of `fetch`.
    ///
    /// 1. Unless `force_refresh`, a fresh entry is returned without a network call
    /// 2. If a fetch for `key` is already in flight, its result is shared
    /// 3. Otherwise `fetch` is started; its payload is stored on success
    ///
    /// The fetch runs as its own task, so it completes (and populates the
    /// cache) even if every waiter goes away.
    pub async fn get_or_fetch<F>(&self, key: K, force_refresh: bool, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fetch<V>,
    {
        let ticket = {
            let mut inner = self.lock();

            if !force_refresh {
                if let Some(entry) = inner.entries.get(&key) {
                    if !entry.is_stale(self.clock.as_ref(), self.ttl) {
                        let payload = entry.payload.clone();
                        inner.stats.record_hit();
                        debug!(cache = self.name, %key, "cache hit");
                        return Ok(payload);
                    }
                }
            }

            if let Some((_, ticket)) = inner.inflight.get(&key) {
                let ticket = ticket.clone();
                inner.stats.record_join();
                debug!(cache = self.name, %key, "joining in-flight fetch");
                ticket
            } else {
                inner.stats.record_miss();
                debug!(cache = self.name, %key, force_refresh, "cache miss, fetching");
                self.start_fetch(&mut inner, key, fetch())
            }
        };

        ticket.await
    }

    fn start_fetch(&self, inner: &mut Inner<K, V>, key: K, fetch: Fetch<V>) -> Ticket<V> {
        let id = inner.next_ticket;
        inner.next_ticket += 1;
        let epoch = inner.epoch;

        let cache = self.clone();
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let result = fetch.await;
            cache.complete(&task_key, id, epoch, &result);
            result
        });

        let ticket = async move {
            handle
                .await
                .unwrap_or_else(|e| Err(CacheError::Internal(format!("fetch task failed: {e}"))))
        }
        .boxed()
        .shared();

        inner.inflight.insert(key, (id, ticket.clone()));
        ticket
    }

    fn complete(&self, key: &K, id: u64, epoch: u64, result: &Result<V>) {
        let mut inner = self.lock();

        if inner.inflight.get(key).map(|(ticket, _)| *ticket) == Some(id) {
            inner.inflight.remove(key);
        }

        match result {
            Ok(payload) if inner.epoch == epoch => {
                let now = self.clock.now();
                self.insert_locked(&mut inner, key.clone(), CacheEntry::new(payload.clone(), now));
            }
            Ok(_) => debug!(cache = self.name, %key, "discarding result fetched before invalidation"),
            Err(e) => warn!(cache = self.name, %key, error = %e, "fetch failed"),
        }
    }

    // == Insert ==
    /// Stores a payload directly with a fresh timestamp.
    pub fn insert(&self, key: K, payload: V) {
        let now = self.clock.now();
        let mut inner = self.lock();
        self.insert_locked(&mut inner, key, CacheEntry::new(payload, now));
    }

    fn insert_locked(&self, inner: &mut Inner<K, V>, key: K, entry: CacheEntry<V>) {
        inner.order.insert(&key);
        inner.entries.insert(key, entry);

        if let Some(capacity) = self.capacity {
            while inner.entries.len() > capacity {
                match inner.order.pop_oldest() {
                    Some(oldest) => {
                        inner.entries.remove(&oldest);
                        inner.stats.record_eviction();
                        debug!(cache = self.name, key = %oldest, "evicted oldest entry");
                    }
                    None => break,
                }
            }
        }

        let len = inner.entries.len();
        inner.stats.set_total_entries(len);
    }

    // == Queries ==
    /// Returns the payload if present and fresh, without touching statistics.
    pub fn peek_fresh(&self, key: &K) -> Option<V> {
        let inner = self.lock();
        inner
            .entries
            .get(key)
            .filter(|entry| !entry.is_stale(self.clock.as_ref(), self.ttl))
            .map(|entry| entry.payload.clone())
    }

    /// True when `key` has a fresh entry or a fetch in flight.
    pub fn is_fresh_or_inflight(&self, key: &K) -> bool {
        let inner = self.lock();
        inner.inflight.contains_key(key)
            || inner
                .entries
                .get(key)
                .is_some_and(|entry| !entry.is_stale(self.clock.as_ref(), self.ttl))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn inflight_count(&self) -> usize {
        self.lock().inflight.len()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.entries.len());
        stats
    }

    // == Invalidation ==
    /// Clears every entry and in-flight ticket.
    ///
    /// Fetches already running still resolve for their current waiters, but
    /// their payloads are not stored.
    pub fn invalidate_all(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
        inner.inflight.clear();
        inner.epoch += 1;
        inner.stats.set_total_entries(0);
        debug!(cache = self.name, "invalidated all entries");
    }

    // == Purge Stale ==
    /// Removes all stale entries. Returns the number removed.
    pub fn purge_stale(&self) -> usize {
        let mut inner = self.lock();
        let stale: Vec<K> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_stale(self.clock.as_ref(), self.ttl))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale {
            inner.entries.remove(key);
            inner.order.remove(key);
        }

        let len = inner.entries.len();
        inner.stats.set_total_entries(len);
        stale.len()
    }
}
