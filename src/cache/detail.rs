//! Detail Cache
//!
//! Per-entity secondary resources (basic info, videos, photos) with their own
//! TTL, a FIFO capacity bound across all sub-resource kinds, and best-effort
//! prefetching of videos and photos after a basic-info read.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheStats, DetailKey, MovieSource, SubResource, TtlCache};
use crate::clock::Clock;
use crate::error::Result;

/// Bounded TTL cache for per-movie sub-resources.
#[derive(Clone)]
pub struct DetailCache {
    cache: TtlCache<DetailKey, Value>,
    source: Arc<dyn MovieSource>,
}

impl DetailCache {
    // == Constructor ==
    /// Creates a Detail Cache holding at most `capacity` entries, oldest
    /// inserted evicted first.
    pub fn new(
        source: Arc<dyn MovieSource>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        capacity: usize,
    ) -> Self {
        Self {
            cache: TtlCache::new("details", clock, ttl, Some(capacity)),
            source,
        }
    }

    // == Reads ==
    /// Returns `sub` for movie `entity_id`, from cache or network.
    ///
    /// A successful basic-info read kicks off a background prefetch of the
    /// movie's videos and photos; the caller does not wait for it.
    pub async fn get_or_fetch(&self, entity_id: u64, sub: SubResource) -> Result<Value> {
        let payload = self.fetch(DetailKey::new(sub, entity_id)).await?;
        if sub == SubResource::Basic {
            self.prefetch(entity_id);
        }
        Ok(payload)
    }

    async fn fetch(&self, key: DetailKey) -> Result<Value> {
        let source = Arc::clone(&self.source);
        self.cache
            .get_or_fetch(key, false, move || source.fetch_detail(key))
            .await
    }

    // == Prefetch ==
    /// Spawns fetches for the prefetched sub-resources that are neither fresh
    /// nor already in flight. Failures are logged and dropped.
    pub fn prefetch(&self, entity_id: u64) {
        for sub in SubResource::PREFETCHED {
            let key = DetailKey::new(sub, entity_id);
            if self.cache.is_fresh_or_inflight(&key) {
                continue;
            }

            debug!(%key, "prefetching");
            let this = self.clone();
            tokio::spawn(async move {
                if let Err(e) = this.fetch(key).await {
                    warn!(%key, error = %e, "prefetch failed");
                }
            });
        }
    }

    // == Maintenance ==
    /// Drops every entry; in-flight results are not stored.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn purge_stale(&self) -> usize {
        self.cache.purge_stale()
    }

    // == Inspection ==
    pub fn contains(&self, key: &DetailKey) -> bool {
        self.cache.contains(key)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::FakeSource;
    use crate::clock::ManualClock;

    const TTL: Duration = Duration::from_secs(60 * 60);

    fn setup(capacity: usize) -> (DetailCache, Arc<FakeSource>, Arc<ManualClock>) {
        let source = Arc::new(FakeSource::default());
        let clock = Arc::new(ManualClock::default());
        let cache = DetailCache::new(source.clone(), clock.clone(), TTL, capacity);
        (cache, source, clock)
    }

    /// Lets spawned prefetch tasks run to completion.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_basic_read_prefetches_videos_and_photos() {
        let (cache, source, _) = setup(500);

        cache.get_or_fetch(42, SubResource::Basic).await.unwrap();
        settle().await;

        assert_eq!(source.detail_calls(SubResource::Videos), 1);
        assert_eq!(source.detail_calls(SubResource::Photos), 1);
        assert!(cache.contains(&DetailKey::new(SubResource::Videos, 42)));

        // Prefetched entries are served from cache
        cache.get_or_fetch(42, SubResource::Videos).await.unwrap();
        assert_eq!(source.detail_calls(SubResource::Videos), 1);
    }

    #[tokio::test]
    async fn test_prefetch_skips_fresh_entries() {
        let (cache, source, _) = setup(500);

        cache.get_or_fetch(1, SubResource::Photos).await.unwrap();
        cache.get_or_fetch(1, SubResource::Basic).await.unwrap();
        settle().await;
        cache.get_or_fetch(1, SubResource::Basic).await.unwrap();
        settle().await;

        assert_eq!(source.detail_calls(SubResource::Basic), 1);
        assert_eq!(source.detail_calls(SubResource::Photos), 1);
        assert_eq!(source.detail_calls(SubResource::Videos), 1);
    }

    #[tokio::test]
    async fn test_prefetch_failure_is_swallowed() {
        let (cache, source, _) = setup(500);
        source.fail_sub(SubResource::Videos);

        let basic = cache.get_or_fetch(5, SubResource::Basic).await;
        settle().await;

        assert!(basic.is_ok());
        assert!(!cache.contains(&DetailKey::new(SubResource::Videos, 5)));
        assert!(cache.contains(&DetailKey::new(SubResource::Photos, 5)));
    }

    #[tokio::test]
    async fn test_non_basic_reads_do_not_prefetch() {
        let (cache, source, _) = setup(500);

        cache.get_or_fetch(3, SubResource::Videos).await.unwrap();
        settle().await;

        assert_eq!(source.detail_calls(SubResource::Photos), 0);
        assert_eq!(source.detail_calls(SubResource::Basic), 0);
    }

    #[tokio::test]
    async fn test_capacity_is_shared_across_sub_resources() {
        let (cache, _, _) = setup(3);

        cache.get_or_fetch(1, SubResource::Videos).await.unwrap();
        cache.get_or_fetch(1, SubResource::Photos).await.unwrap();
        cache.get_or_fetch(2, SubResource::Videos).await.unwrap();
        // Reading the oldest entry does not protect it
        cache.get_or_fetch(1, SubResource::Videos).await.unwrap();
        cache.get_or_fetch(2, SubResource::Photos).await.unwrap();

        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&DetailKey::new(SubResource::Videos, 1)));
        assert!(cache.contains(&DetailKey::new(SubResource::Photos, 1)));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn test_detail_ttl() {
        let (cache, source, clock) = setup(500);

        cache.get_or_fetch(9, SubResource::Photos).await.unwrap();
        clock.advance(TTL);
        cache.get_or_fetch(9, SubResource::Photos).await.unwrap();

        assert_eq!(source.detail_calls(SubResource::Photos), 2);
    }
}
