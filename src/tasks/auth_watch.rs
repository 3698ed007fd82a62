//! Auth Status Watcher
//!
//! Forwards auth status changes to the Load Coordinator.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::auth::AuthStatus;
use crate::calendar::LoadCoordinator;

/// Spawns a task applying every status published on `statuses` to
/// `coordinator`. Ends when the sender is dropped.
pub fn spawn_auth_watcher(
    mut statuses: watch::Receiver<AuthStatus>,
    coordinator: LoadCoordinator,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let initial = *statuses.borrow_and_update();
        coordinator.set_auth_status(initial);

        while statuses.changed().await.is_ok() {
            let status = *statuses.borrow_and_update();
            info!(?status, "auth status changed");
            coordinator.set_auth_status(status);
        }
        debug!("auth status channel closed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionStore;
    use crate::calendar::testing::FakeCalendar;
    use crate::calendar::{BucketKey, BucketState, LoadOutcome};
    use std::sync::Arc;
    use std::time::Duration;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_status_changes_reach_coordinator() {
        let coordinator = LoadCoordinator::new(
            Arc::new(FakeCalendar::default()),
            Arc::new(SessionStore::in_memory()),
        );
        let (tx, rx) = watch::channel(AuthStatus::Checking);
        let handle = spawn_auth_watcher(rx, coordinator.clone());
        let bucket = BucketKey::new(2025, 3).unwrap();

        settle().await;
        assert_eq!(coordinator.load(bucket, false).await, LoadOutcome::AwaitingAuth);

        tx.send_replace(AuthStatus::Authenticated);
        settle().await;
        assert_eq!(coordinator.load(bucket, false).await, LoadOutcome::Loaded(2));

        tx.send_replace(AuthStatus::LoggedOut);
        settle().await;
        assert_eq!(coordinator.snapshot(bucket).state, BucketState::Absent);

        drop(tx);
        settle().await;
        assert!(handle.is_finished());
    }
}
