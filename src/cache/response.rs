//! Response Cache
//!
//! Serves list/page-shaped reads keyed by (resource kind, page, size).

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::cache::{CacheStats, ListKey, MovieSource, ResourceKind, TtlCache};
use crate::clock::Clock;
use crate::error::Result;

/// In-process TTL cache for list resources.
#[derive(Clone)]
pub struct ResponseCache {
    cache: TtlCache<ListKey, Value>,
    source: Arc<dyn MovieSource>,
}

impl ResponseCache {
    // == Constructor ==
    /// Creates an unbounded Response Cache over `source`.
    ///
    /// # Arguments
    /// * `source` - Where misses are fetched from
    /// * `clock` - Time source for entry ages
    /// * `ttl` - Age at which an entry stops being served
    pub fn new(source: Arc<dyn MovieSource>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            cache: TtlCache::new("responses", clock, ttl, None),
            source,
        }
    }

    // == Reads ==
    /// Returns page `page` of `kind` with `size` items per page.
    ///
    /// Never issues more than one concurrent network call per key; callers
    /// arriving while one is pending receive its result.
    pub async fn get(
        &self,
        kind: ResourceKind,
        page: u32,
        size: u32,
        force_refresh: bool,
    ) -> Result<Value> {
        let key = ListKey::new(kind, page, size);
        let source = Arc::clone(&self.source);
        let request = key.clone();
        self.cache
            .get_or_fetch(key, force_refresh, move || source.fetch_list(&request))
            .await
    }

    // == Maintenance ==
    /// Clears every entry and ticket; the next `get` of any key hits the network.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Removes expired entries. Returns how many were removed.
    pub fn purge_stale(&self) -> usize {
        self.cache.purge_stale()
    }

    /// Snapshot of the hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
