//! Stale Entry Sweeper
//!
//! Background task that periodically removes stale entries from the Response
//! Cache and Detail Cache. In-flight tickets are left alone.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheManager;

/// Spawns a background task that periodically purges stale cache entries.
///
/// # Arguments
/// * `manager` - Owner of both in-memory caches
/// * `interval` - Time between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let sweeper = spawn_cleanup_task(manager.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// sweeper.abort();
/// ```
pub fn spawn_cleanup_task(manager: CacheManager, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "starting stale entry sweeper");

        loop {
            tokio::time::sleep(interval).await;

            let removed = manager.purge_stale();
            if removed > 0 {
                info!(removed, "swept stale cache entries");
            } else {
                debug!("sweep found no stale entries");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::FakeSource;
    use crate::cache::{ResourceKind, SubResource};
    use crate::clock::ManualClock;
    use crate::config::Config;
    use std::sync::Arc;

    const TICK: Duration = Duration::from_millis(20);

    fn setup() -> (CacheManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let manager =
            CacheManager::new(Arc::new(FakeSource::default()), clock.clone(), &Config::default());
        (manager, clock)
    }

    #[tokio::test]
    async fn test_sweeper_removes_stale_entries() {
        let (manager, clock) = setup();
        manager.list(ResourceKind::Movies, 1, 20, false).await.unwrap();
        clock.advance(Duration::from_secs(31 * 60));

        let handle = spawn_cleanup_task(manager.clone(), TICK);
        tokio::time::sleep(TICK * 5).await;

        assert_eq!(manager.stats().responses.total_entries, 0);
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweeper_preserves_fresh_entries() {
        let (manager, _) = setup();
        manager.detail(3, SubResource::Photos).await.unwrap();

        let handle = spawn_cleanup_task(manager.clone(), TICK);
        tokio::time::sleep(TICK * 5).await;

        assert_eq!(manager.stats().details.total_entries, 1);
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweeper_can_be_aborted() {
        let (manager, _) = setup();
        let handle = spawn_cleanup_task(manager, TICK);

        handle.abort();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
