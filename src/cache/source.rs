//! Network seam for the in-memory caches.

use futures::future::BoxFuture;
use serde_json::Value;

use crate::cache::{DetailKey, ListKey};
use crate::error::Result;

/// Where the Response Cache and Detail Cache get their data from.
///
/// Returned futures are `'static` so they can be driven by a detached task;
/// implementors clone whatever handles they need into the future.
pub trait MovieSource: Send + Sync + 'static {
    /// Fetches one page of a list resource.
    fn fetch_list(&self, key: &ListKey) -> BoxFuture<'static, Result<Value>>;

    /// Fetches one sub-resource of a movie.
    fn fetch_detail(&self, key: DetailKey) -> BoxFuture<'static, Result<Value>>;

    /// Asks the backend to re-sync its movie catalogue (a write).
    fn sync_movies(&self) -> BoxFuture<'static, Result<Value>>;
}
