//! Cache Entry Module
//!
//! Defines in-memory cache entries and their staleness rule.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::clock::{self, Clock};

// == Cache Entry ==
/// A cached payload with the time it was inserted.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub inserted_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(payload: T, inserted_at: DateTime<Utc>) -> Self {
        Self {
            payload,
            inserted_at,
        }
    }

    // == Is Stale ==
    /// An entry is stale once its age has reached the TTL.
    ///
    /// Boundary condition: age == ttl is stale, so an entry is only ever
    /// served while its age is strictly below the TTL.
    pub fn is_stale(&self, clock: &dyn Clock, ttl: Duration) -> bool {
        clock::age(clock, self.inserted_at) >= ttl
    }
}
