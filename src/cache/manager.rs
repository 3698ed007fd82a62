//! Cache Manager
//!
//! Owns the Response Cache and Detail Cache for the whole process. Built once
//! at startup with an injected clock and source, then shared by reference.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::cache::{CacheStats, DetailCache, MovieSource, ResourceKind, ResponseCache, SubResource};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::Result;

/// Statistics for both in-memory caches.
#[derive(Debug, Clone, Serialize)]
pub struct ManagerStats {
    pub responses: CacheStats,
    pub details: CacheStats,
}

#[derive(Clone)]
pub struct CacheManager {
    responses: ResponseCache,
    details: DetailCache,
    source: Arc<dyn MovieSource>,
}

impl CacheManager {
    pub fn new(source: Arc<dyn MovieSource>, clock: Arc<dyn Clock>, config: &Config) -> Self {
        Self {
            responses: ResponseCache::new(Arc::clone(&source), Arc::clone(&clock), config.list_ttl()),
            details: DetailCache::new(
                Arc::clone(&source),
                clock,
                config.detail_ttl(),
                config.detail_cache_capacity,
            ),
            source,
        }
    }

    pub async fn list(
        &self,
        kind: ResourceKind,
        page: u32,
        size: u32,
        force_refresh: bool,
    ) -> Result<Value> {
        self.responses.get(kind, page, size, force_refresh).await
    }

    pub async fn detail(&self, entity_id: u64, sub: SubResource) -> Result<Value> {
        self.details.get_or_fetch(entity_id, sub).await
    }

    /// Triggers a backend catalogue sync, then drops every cached read.
    ///
    /// A failed sync is returned to the caller and leaves the caches untouched.
    pub async fn sync_movies(&self) -> Result<Value> {
        let outcome = self.source.sync_movies().await?;
        self.invalidate_all();
        info!("movie sync finished, caches invalidated");
        Ok(outcome)
    }

    pub fn invalidate_all(&self) {
        self.responses.invalidate_all();
        self.details.invalidate_all();
    }

    /// Removes stale entries from both caches. Returns the number removed.
    pub fn purge_stale(&self) -> usize {
        self.responses.purge_stale() + self.details.purge_stale()
    }

    pub fn responses(&self) -> &ResponseCache {
        &self.responses
    }

    pub fn details(&self) -> &DetailCache {
        &self.details
    }

    pub fn stats(&self) -> ManagerStats {
        ManagerStats {
            responses: self.responses.stats(),
            details: self.details.stats(),
        }
    }
}
