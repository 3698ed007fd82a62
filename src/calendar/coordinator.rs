//! Load Coordinator
//!
//! Tracks calendar data per year-month bucket. At most one load per bucket
//! runs at a time, loads wait for the auth gate, and a logout drops every
//! bucket along with any load still in progress.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::auth::{AuthGate, AuthStatus, SessionStore};
use crate::calendar::{BucketKey, CalendarSource};
use crate::error::{CacheError, Result};
use crate::models::{entries_from_month, CalendarEntry, SaveEntryRequest};

/// Result of a `load` call.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The bucket was fetched and now holds this many entries
    Loaded(usize),
    /// The fetch failed; the bucket was populated empty with the error
    Failed(CacheError),
    /// Data present and no reload requested
    AlreadyLoaded,
    /// Another load of the same bucket is in progress
    AlreadyLoading,
    /// Neither auth signal allows a load yet
    AwaitingAuth,
    /// A logout happened while the fetch was in flight
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketState {
    Absent,
    Loading,
    Populated,
}

/// Point-in-time view of one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketSnapshot {
    pub bucket: String,
    pub state: BucketState,
    pub entries: Vec<CalendarEntry>,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct Bucket {
    is_loading: bool,
    data: Option<Vec<CalendarEntry>>,
    error: Option<String>,
}

#[derive(Default)]
struct Inner {
    buckets: HashMap<BucketKey, Bucket>,
    auth: AuthStatus,
    /// Bumped on every reset; loads started under an older value are dropped
    generation: u64,
}

#[derive(Clone)]
pub struct LoadCoordinator {
    inner: Arc<Mutex<Inner>>,
    source: Arc<dyn CalendarSource>,
    session: Arc<SessionStore>,
}

impl LoadCoordinator {
    pub fn new(source: Arc<dyn CalendarSource>, session: Arc<SessionStore>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            source,
            session,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn gate(&self) -> AuthGate {
        let ready = self.lock().auth.is_ready();
        AuthGate::new(ready, self.session.has_token())
    }

    pub fn auth_status(&self) -> AuthStatus {
        self.lock().auth
    }

    /// Records the latest auth status. `LoggedOut` resets every bucket.
    pub fn set_auth_status(&self, status: AuthStatus) {
        self.lock().auth = status;
        if status == AuthStatus::LoggedOut {
            self.reset();
        }
    }

    /// Drops every bucket and orphans any load in progress.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.buckets.clear();
        inner.generation += 1;
        info!("calendar buckets reset");
    }

    // == Load ==
    /// Loads `bucket` unless it is already loading, already populated (and
    /// `force` is false), or the auth gate is closed.
    pub async fn load(&self, bucket: BucketKey, force: bool) -> LoadOutcome {
        if !self.gate().allows() {
            debug!(%bucket, "load deferred until auth is ready");
            return LoadOutcome::AwaitingAuth;
        }

        let generation = {
            let mut inner = self.lock();
            let generation = inner.generation;
            let state = inner.buckets.entry(bucket).or_default();
            if state.is_loading {
                debug!(%bucket, "load already in progress");
                return LoadOutcome::AlreadyLoading;
            }
            if state.data.is_some() && !force {
                return LoadOutcome::AlreadyLoaded;
            }
            state.is_loading = true;
            state.error = None;
            generation
        };

        // The fetch and settle run detached so a dropped caller cannot leave
        // the bucket stuck in `loading`.
        let this = self.clone();
        let task = tokio::spawn(async move {
            let result = this.source.fetch_month(bucket).await;
            this.settle(bucket, generation, result)
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                let error = CacheError::Internal(format!("load task failed: {e}"));
                self.settle(bucket, generation, Err(error))
            }
        }
    }

    fn settle(
        &self,
        bucket: BucketKey,
        generation: u64,
        result: Result<serde_json::Value>,
    ) -> LoadOutcome {
        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(%bucket, "discarding load that finished after reset");
            return LoadOutcome::Discarded;
        }

        let state = inner.buckets.entry(bucket).or_default();
        state.is_loading = false;
        match result {
            Ok(value) => {
                let entries = entries_from_month(value);
                let count = entries.len();
                state.data = Some(entries);
                debug!(%bucket, count, "bucket loaded");
                LoadOutcome::Loaded(count)
            }
            Err(e) => {
                warn!(%bucket, error = %e, "bucket load failed");
                state.data = Some(Vec::new());
                state.error = Some(e.to_string());
                LoadOutcome::Failed(e)
            }
        }
    }

    // == Reads ==
    pub fn snapshot(&self, bucket: BucketKey) -> BucketSnapshot {
        let inner = self.lock();
        let (state, entries, error) = match inner.buckets.get(&bucket) {
            None => (BucketState::Absent, Vec::new(), None),
            Some(b) if b.is_loading => (
                BucketState::Loading,
                b.data.clone().unwrap_or_default(),
                b.error.clone(),
            ),
            Some(Bucket {
                data: Some(data),
                error,
                ..
            }) => (BucketState::Populated, data.clone(), error.clone()),
            Some(b) => (BucketState::Absent, Vec::new(), b.error.clone()),
        };

        BucketSnapshot {
            bucket: bucket.to_string(),
            state,
            entries,
            error,
        }
    }

    /// The entry for `date`, if its bucket is populated and has one.
    pub fn entry_for_date(&self, date: NaiveDate) -> Option<CalendarEntry> {
        let bucket = BucketKey::from_date(date);
        self.lock()
            .buckets
            .get(&bucket)?
            .data
            .as_ref()?
            .iter()
            .find(|entry| entry.date == date)
            .cloned()
    }

    // == Writes ==
    /// Saves through the remote API, then upserts the day into its bucket
    /// when that bucket is populated. Failures are recorded and returned.
    pub async fn save_entry(&self, request: SaveEntryRequest) -> Result<CalendarEntry> {
        let bucket = BucketKey::from_date(request.date);
        match self.source.save_entry(request).await {
            Ok(entry) => {
                let mut inner = self.lock();
                if let Some(data) = inner
                    .buckets
                    .get_mut(&bucket)
                    .and_then(|b| b.data.as_mut())
                {
                    match data.iter_mut().find(|e| e.day == entry.day) {
                        Some(existing) => *existing = entry.clone(),
                        None => data.push(entry.clone()),
                    }
                }
                Ok(entry)
            }
            Err(e) => {
                self.record_error(bucket, &e);
                Err(e)
            }
        }
    }

    /// Deletes through the remote API, then removes the day from its bucket.
    pub async fn delete_entry(&self, date: NaiveDate) -> Result<()> {
        let bucket = BucketKey::from_date(date);
        match self.source.delete_entry(date).await {
            Ok(()) => {
                let mut inner = self.lock();
                if let Some(data) = inner
                    .buckets
                    .get_mut(&bucket)
                    .and_then(|b| b.data.as_mut())
                {
                    data.retain(|e| e.date != date);
                }
                Ok(())
            }
            Err(e) => {
                self.record_error(bucket, &e);
                Err(e)
            }
        }
    }

    fn record_error(&self, bucket: BucketKey, error: &CacheError) {
        warn!(%bucket, %error, "calendar write failed");
        self.lock().buckets.entry(bucket).or_default().error = Some(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::testing::FakeCalendar;
    use tokio_test::{assert_pending, assert_ready, task};

    fn march() -> BucketKey {
        BucketKey::new(2025, 3).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn setup() -> (LoadCoordinator, Arc<FakeCalendar>, Arc<SessionStore>) {
        let source = Arc::new(FakeCalendar::default());
        let session = Arc::new(SessionStore::in_memory());
        let coordinator = LoadCoordinator::new(source.clone(), session.clone());
        coordinator.set_auth_status(AuthStatus::Authenticated);
        (coordinator, source, session)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_gate_blocks_until_either_signal() {
        let source = Arc::new(FakeCalendar::default());
        let session = Arc::new(SessionStore::in_memory());
        let coordinator = LoadCoordinator::new(source.clone(), session.clone());

        assert_eq!(coordinator.load(march(), false).await, LoadOutcome::AwaitingAuth);
        assert_eq!(source.month_calls(), 0);

        // A stored credential is enough while auth is still checking
        session.set_token("t").unwrap();
        assert_eq!(coordinator.load(march(), false).await, LoadOutcome::Loaded(2));
    }

    #[tokio::test]
    async fn test_populated_bucket_short_circuits() {
        let (coordinator, source, _) = setup();

        coordinator.load(march(), false).await;
        assert_eq!(coordinator.load(march(), false).await, LoadOutcome::AlreadyLoaded);
        assert_eq!(source.month_calls(), 1);

        assert_eq!(coordinator.load(march(), true).await, LoadOutcome::Loaded(2));
        assert_eq!(source.month_calls(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_load_guard() {
        let (coordinator, source, _) = setup();
        source.hold();

        let mut first = task::spawn(coordinator.load(march(), false));
        assert_pending!(first.poll());
        assert_eq!(coordinator.snapshot(march()).state, BucketState::Loading);

        // Same bucket, with or without force
        assert_eq!(coordinator.load(march(), false).await, LoadOutcome::AlreadyLoading);
        assert_eq!(coordinator.load(march(), true).await, LoadOutcome::AlreadyLoading);

        source.release();
        settle().await;
        assert_eq!(assert_ready!(first.poll()), LoadOutcome::Loaded(2));
        assert_eq!(source.month_calls(), 1);
        assert_eq!(coordinator.snapshot(march()).state, BucketState::Populated);
    }

    #[tokio::test]
    async fn test_distinct_buckets_load_concurrently() {
        let (coordinator, source, _) = setup();
        source.hold();

        let mut a = task::spawn(coordinator.load(march(), false));
        let mut b = task::spawn(coordinator.load(march().next(), false));
        assert_pending!(a.poll());
        assert_pending!(b.poll());

        source.release();
        settle().await;
        assert_ready!(a.poll());
        assert_ready!(b.poll());
        assert_eq!(source.month_calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_load_populates_empty_with_error() {
        let (coordinator, source, _) = setup();
        source.fail_next();

        let outcome = coordinator.load(march(), false).await;
        let snapshot = coordinator.snapshot(march());

        assert!(matches!(outcome, LoadOutcome::Failed(_)));
        assert_eq!(snapshot.state, BucketState::Populated);
        assert!(snapshot.entries.is_empty());
        assert!(snapshot.error.is_some());
    }

    #[tokio::test]
    async fn test_non_array_response_populates_empty() {
        let (coordinator, source, _) = setup();
        source.set_month(serde_json::json!({ "unexpected": true }));

        assert_eq!(coordinator.load(march(), false).await, LoadOutcome::Loaded(0));
        assert_eq!(coordinator.snapshot(march()).state, BucketState::Populated);
    }

    #[tokio::test]
    async fn test_logout_resets_and_discards_in_flight_load() {
        let (coordinator, source, _) = setup();
        coordinator.load(march().prev(), false).await;
        source.hold();

        let mut pending = task::spawn(coordinator.load(march(), false));
        assert_pending!(pending.poll());
        coordinator.set_auth_status(AuthStatus::LoggedOut);
        source.release();
        settle().await;

        assert_eq!(assert_ready!(pending.poll()), LoadOutcome::Discarded);
        assert_eq!(coordinator.snapshot(march()).state, BucketState::Absent);
        assert_eq!(coordinator.snapshot(march().prev()).state, BucketState::Absent);
    }

    #[tokio::test]
    async fn test_entry_for_date() {
        let (coordinator, _, _) = setup();
        assert!(coordinator.entry_for_date(date(1)).is_none());

        coordinator.load(march(), false).await;

        assert_eq!(coordinator.entry_for_date(date(1)).unwrap().day, 1);
        assert!(coordinator.entry_for_date(date(2)).is_none());
    }

    #[tokio::test]
    async fn test_save_upserts_and_delete_removes() {
        let (coordinator, _, _) = setup();
        coordinator.load(march(), false).await;

        let request = |day, mood: &str| SaveEntryRequest {
            date: date(day),
            mood_emoji: mood.to_string(),
            note: String::new(),
            movie_id: None,
        };
        coordinator.save_entry(request(1, "sad")).await.unwrap();
        coordinator.save_entry(request(20, "calm")).await.unwrap();

        let snapshot = coordinator.snapshot(march());
        assert_eq!(snapshot.entries.len(), 3);
        assert_eq!(coordinator.entry_for_date(date(1)).unwrap().mood.as_deref(), Some("sad"));

        coordinator.delete_entry(date(1)).await.unwrap();
        assert!(coordinator.entry_for_date(date(1)).is_none());
        assert_eq!(coordinator.snapshot(march()).entries.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_write_is_propagated_and_recorded() {
        let (coordinator, source, _) = setup();
        coordinator.load(march(), false).await;
        source.fail_next();

        let result = coordinator.delete_entry(date(1)).await;

        assert!(result.is_err());
        assert!(coordinator.entry_for_date(date(1)).is_some());
        assert!(coordinator.snapshot(march()).error.is_some());
    }
}
