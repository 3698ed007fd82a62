//! Versioned names of the three persistent stores.

use serde::Serialize;

/// Which persistent store a response belongs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// App shell and other static assets
    Static,
    /// Unauthenticated GET JSON responses
    Api,
    /// Binary image responses
    Image,
}

impl StoreKind {
    pub const ALL: [StoreKind; 3] = [StoreKind::Static, StoreKind::Api, StoreKind::Image];
}

/// Current store names for one cache version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreNames {
    static_store: String,
    api_store: String,
    image_store: String,
}

impl StoreNames {
    pub fn new(version: &str) -> Self {
        Self {
            static_store: format!("moodflix-{version}"),
            api_store: format!("moodflix-api-{version}"),
            image_store: format!("moodflix-images-{version}"),
        }
    }

    pub fn name(&self, kind: StoreKind) -> &str {
        match kind {
            StoreKind::Static => &self.static_store,
            StoreKind::Api => &self.api_store,
            StoreKind::Image => &self.image_store,
        }
    }

    /// True if `name` is one of the current store names.
    pub fn is_current(&self, name: &str) -> bool {
        StoreKind::ALL.iter().any(|kind| self.name(*kind) == name)
    }
}
