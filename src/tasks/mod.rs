//! Background Tasks Module
//!
//! Long-running tasks spawned at startup.
//!
//! # Tasks
//! - Stale sweeper: removes stale in-memory cache entries at a fixed interval
//! - Auth watcher: applies auth status changes to the Load Coordinator

mod auth_watch;
mod cleanup;

pub use auth_watch::spawn_auth_watcher;
pub use cleanup::spawn_cleanup_task;
