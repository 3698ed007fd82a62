//! Scripted `MovieSource` for cache tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use futures::future::{BoxFuture, FutureExt};
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::cache::{DetailKey, ListKey, MovieSource, SubResource};
use crate::error::{CacheError, Result};

/// Counts calls, can hold every fetch until released, and can fail on demand.
pub struct FakeSource {
    list_calls: AtomicUsize,
    detail_calls: Mutex<HashMap<SubResource, usize>>,
    sync_calls: AtomicUsize,
    fail_next: AtomicBool,
    failing_subs: Mutex<Vec<SubResource>>,
    open: watch::Sender<bool>,
}

impl Default for FakeSource {
    fn default() -> Self {
        let (open, _) = watch::channel(true);
        Self {
            list_calls: AtomicUsize::new(0),
            detail_calls: Mutex::new(HashMap::new()),
            sync_calls: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
            failing_subs: Mutex::new(Vec::new()),
            open,
        }
    }
}

impl FakeSource {
    /// Makes every subsequent fetch wait for `release`.
    pub fn hold(&self) {
        self.open.send_replace(false);
    }

    pub fn release(&self) {
        self.open.send_replace(true);
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn fail_sub(&self, sub: SubResource) {
        self.failing_subs.lock().unwrap().push(sub);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self, sub: SubResource) -> usize {
        self.detail_calls.lock().unwrap().get(&sub).copied().unwrap_or(0)
    }

    pub fn sync_calls(&self) -> usize {
        self.sync_calls.load(Ordering::SeqCst)
    }

    fn respond(&self, value: Value, fail: bool) -> BoxFuture<'static, Result<Value>> {
        let mut open = self.open.subscribe();
        async move {
            loop {
                let ready = *open.borrow_and_update();
                if ready || open.changed().await.is_err() {
                    break;
                }
            }
            if fail {
                Err(CacheError::Network("connection refused".into()))
            } else {
                Ok(value)
            }
        }
        .boxed()
    }
}

impl MovieSource for FakeSource {
    fn fetch_list(&self, key: &ListKey) -> BoxFuture<'static, Result<Value>> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let fail = self.fail_next.swap(false, Ordering::SeqCst);
        self.respond(json!({ "key": key.to_string(), "call": call }), fail)
    }

    fn fetch_detail(&self, key: DetailKey) -> BoxFuture<'static, Result<Value>> {
        let call = {
            let mut calls = self.detail_calls.lock().unwrap();
            let count = calls.entry(key.sub).or_insert(0);
            *count += 1;
            *count
        };
        let fail = self.fail_next.swap(false, Ordering::SeqCst)
            || self.failing_subs.lock().unwrap().contains(&key.sub);
        self.respond(json!({ "key": key.to_string(), "call": call }), fail)
    }

    fn sync_movies(&self) -> BoxFuture<'static, Result<Value>> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        let fail = self.fail_next.swap(false, Ordering::SeqCst);
        self.respond(json!({ "synced": true }), fail)
    }
}
