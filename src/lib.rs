//! flixcache - client-side caching sidecar for a movie/mood-calendar app
//!
//! Provides an interception proxy over three persistent response stores, a
//! TTL response cache with in-flight deduplication, a bounded detail cache
//! and a month-bucketed calendar load coordinator.

pub mod api;
pub mod auth;
pub mod cache;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod proxy;
pub mod remote;
pub mod store;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::CacheManager;
pub use calendar::LoadCoordinator;
pub use config::Config;
pub use error::{CacheError, Result};
pub use proxy::InterceptionAgent;
pub use store::ResponseStores;
pub use tasks::{spawn_auth_watcher, spawn_cleanup_task};
