//! Cache Module
//!
//! In-process caches sitting between the UI and the network:
//! - `ResponseCache`: list/page reads with a TTL and in-flight deduplication
//! - `DetailCache`: per-movie sub-resources with a FIFO capacity bound and prefetching
//! - `CacheManager`: owns both, built once per process

mod detail;
mod entry;
mod fifo;
mod key;
mod manager;
mod response;
mod source;
mod stats;
mod ttl;

#[cfg(test)]
pub(crate) mod testing;

// Re-export public types
pub use detail::DetailCache;
pub use entry::CacheEntry;
pub use fifo::FifoTracker;
pub use key::{DetailKey, ListKey, ResourceKind, SearchQuery, SubResource};
pub use manager::{CacheManager, ManagerStats};
pub use response::ResponseCache;
pub use source::MovieSource;
pub use stats::CacheStats;
pub use ttl::{Fetch, TtlCache};
