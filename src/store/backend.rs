//! Storage backends for the persistent response stores.
//!
//! A backend holds any number of named stores. Each store maps a request key
//! to a response and remembers insertion order, so the oldest entry can be
//! found for count-limited stores.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::cache::FifoTracker;
use crate::error::{CacheError, Result};
use crate::proxy::ProxyResponse;

/// Keyed response storage, grouped into named stores.
///
/// Operations on a store that was never opened behave as on an empty store,
/// except `put`, which opens it.
pub trait StoreBackend: Send + Sync {
    /// Names of every store currently present.
    fn store_names(&self) -> Result<Vec<String>>;

    /// Creates `store` if it does not exist.
    fn open(&self, store: &str) -> Result<()>;

    fn get(&self, store: &str, key: &str) -> Result<Option<ProxyResponse>>;

    /// Writes `response` under `key`. Rewriting a key makes it the newest entry.
    fn put(&self, store: &str, key: &str, response: &ProxyResponse) -> Result<()>;

    /// Removes `key`. Returns true if it existed.
    fn delete(&self, store: &str, key: &str) -> Result<bool>;

    /// Keys in insertion order, oldest first.
    fn keys(&self, store: &str) -> Result<Vec<String>>;

    fn len(&self, store: &str) -> Result<usize> {
        Ok(self.keys(store)?.len())
    }

    /// Drops `store` and all its entries. Returns true if it existed.
    fn delete_store(&self, store: &str) -> Result<bool>;
}

// == Memory Backend ==
#[derive(Default)]
struct MemoryStore {
    entries: HashMap<String, ProxyResponse>,
    order: FifoTracker<String>,
}

/// Process-local backend. Contents are lost on exit.
#[derive(Default)]
pub struct MemoryBackend {
    stores: Mutex<BTreeMap<String, MemoryStore>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, MemoryStore>>> {
        self.stores
            .lock()
            .map_err(|_| CacheError::Storage("memory store lock poisoned".to_string()))
    }
}

impl StoreBackend for MemoryBackend {
    fn store_names(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    fn open(&self, store: &str) -> Result<()> {
        self.lock()?.entry(store.to_string()).or_default();
        Ok(())
    }

    fn get(&self, store: &str, key: &str) -> Result<Option<ProxyResponse>> {
        Ok(self
            .lock()?
            .get(store)
            .and_then(|s| s.entries.get(key))
            .cloned())
    }

    fn put(&self, store: &str, key: &str, response: &ProxyResponse) -> Result<()> {
        let mut stores = self.lock()?;
        let entry = stores.entry(store.to_string()).or_default();
        entry.entries.insert(key.to_string(), response.clone());
        entry.order.insert(&key.to_string());
        Ok(())
    }

    fn delete(&self, store: &str, key: &str) -> Result<bool> {
        let mut stores = self.lock()?;
        let Some(entry) = stores.get_mut(store) else {
            return Ok(false);
        };
        entry.order.remove(&key.to_string());
        Ok(entry.entries.remove(key).is_some())
    }

    fn keys(&self, store: &str) -> Result<Vec<String>> {
        Ok(self
            .lock()?
            .get(store)
            .map(|s| s.order.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn len(&self, store: &str) -> Result<usize> {
        Ok(self.lock()?.get(store).map_or(0, |s| s.entries.len()))
    }

    fn delete_store(&self, store: &str) -> Result<bool> {
        Ok(self.lock()?.remove(store).is_some())
    }
}
