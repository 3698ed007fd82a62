//! Persistent Store Module
//!
//! Three named response stores (static, api, image) that outlive any single
//! request. `ResponseStores` resolves store kinds to their versioned names and
//! implements count limiting on top of a pluggable `StoreBackend`.

mod backend;
mod names;
mod sqlite;

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::proxy::ProxyResponse;

pub use backend::{MemoryBackend, StoreBackend};
pub use names::{StoreKind, StoreNames};
pub use sqlite::SqliteBackend;

/// Entry counts for the current stores.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StoreCounts {
    pub static_entries: usize,
    pub api_entries: usize,
    pub image_entries: usize,
}

// == Response Stores ==
/// The three persistent response stores over one backend.
#[derive(Clone)]
pub struct ResponseStores {
    backend: Arc<dyn StoreBackend>,
    names: StoreNames,
}

impl ResponseStores {
    // == Constructors ==
    /// Creates the stores for cache `version` on top of `backend`.
    pub fn new(backend: Arc<dyn StoreBackend>, version: &str) -> Self {
        Self {
            backend,
            names: StoreNames::new(version),
        }
    }

    /// Builds the backend selected by `config.store_path`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend: Arc<dyn StoreBackend> = if config.uses_memory_store() {
            Arc::new(MemoryBackend::new())
        } else {
            Arc::new(SqliteBackend::open(std::path::Path::new(&config.store_path))?)
        };
        Ok(Self::new(backend, &config.cache_version))
    }

    // == Accessors ==
    pub fn names(&self) -> &StoreNames {
        &self.names
    }

    pub fn backend(&self) -> &Arc<dyn StoreBackend> {
        &self.backend
    }

    // == Entry Operations ==
    /// Creates the store for `kind` if it does not exist yet.
    pub fn open(&self, kind: StoreKind) -> Result<()> {
        self.backend.open(self.names.name(kind))
    }

    /// Returns the response stored under `key`, if any.
    pub fn lookup(&self, kind: StoreKind, key: &str) -> Result<Option<ProxyResponse>> {
        self.backend.get(self.names.name(kind), key)
    }

    /// Stores `response` under `key`, making it the newest entry.
    pub fn put(&self, kind: StoreKind, key: &str, response: &ProxyResponse) -> Result<()> {
        self.backend.put(self.names.name(kind), key, response)
    }

    /// Number of entries in the store for `kind`.
    pub fn len(&self, kind: StoreKind) -> Result<usize> {
        self.backend.len(self.names.name(kind))
    }

    // == Maintenance ==
    /// Deletes oldest-inserted entries until `kind` holds at most `max` entries.
    /// Returns the number deleted.
    pub fn enforce_limit(&self, kind: StoreKind, max: usize) -> Result<usize> {
        let name = self.names.name(kind);
        let keys = self.backend.keys(name)?;
        let excess = keys.len().saturating_sub(max);

        for key in keys.iter().take(excess) {
            self.backend.delete(name, key)?;
        }
        if excess > 0 {
            debug!(store = name, deleted = excess, "trimmed store to limit");
        }
        Ok(excess)
    }

    /// Deletes every store whose name is not a current store name.
    /// Returns the deleted names.
    pub fn delete_outdated(&self) -> Result<Vec<String>> {
        let mut deleted = Vec::new();
        for name in self.backend.store_names()? {
            if !self.names.is_current(&name) && self.backend.delete_store(&name)? {
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Entry counts of all three stores.
    pub fn counts(&self) -> Result<StoreCounts> {
        Ok(StoreCounts {
            static_entries: self.len(StoreKind::Static)?,
            api_entries: self.len(StoreKind::Api)?,
            image_entries: self.len(StoreKind::Image)?,
        })
    }
}
