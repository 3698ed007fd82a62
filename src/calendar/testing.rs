//! Scripted `CalendarSource` for coordinator tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::NaiveDate;
use futures::future::{BoxFuture, FutureExt};
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::calendar::{BucketKey, CalendarSource};
use crate::error::{CacheError, Result};
use crate::models::{CalendarEntry, SaveEntryRequest};

/// Returns two entries (days 1 and 15) for any month unless scripted.
pub struct FakeCalendar {
    month_calls: AtomicUsize,
    fail_next: AtomicBool,
    month: Mutex<Option<Value>>,
    open: watch::Sender<bool>,
}

impl Default for FakeCalendar {
    fn default() -> Self {
        let (open, _) = watch::channel(true);
        Self {
            month_calls: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
            month: Mutex::new(None),
            open,
        }
    }
}

impl FakeCalendar {
    pub fn hold(&self) {
        self.open.send_replace(false);
    }

    pub fn release(&self) {
        self.open.send_replace(true);
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn set_month(&self, value: Value) {
        *self.month.lock().unwrap() = Some(value);
    }

    pub fn month_calls(&self) -> usize {
        self.month_calls.load(Ordering::SeqCst)
    }

    fn respond<T: Send + 'static>(&self, value: T) -> BoxFuture<'static, Result<T>> {
        let fail = self.fail_next.swap(false, Ordering::SeqCst);
        let mut open = self.open.subscribe();
        async move {
            loop {
                let ready = *open.borrow_and_update();
                if ready || open.changed().await.is_err() {
                    break;
                }
            }
            if fail {
                Err(CacheError::Http {
                    status: 500,
                    message: "server error".into(),
                })
            } else {
                Ok(value)
            }
        }
        .boxed()
    }
}

impl CalendarSource for FakeCalendar {
    fn fetch_month(&self, bucket: BucketKey) -> BoxFuture<'static, Result<Value>> {
        self.month_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.month.lock().unwrap().clone();
        let value = scripted.unwrap_or_else(|| {
            json!([
                { "id": 1, "date": format!("{}-{:02}-01", bucket.year, bucket.month), "moodEmoji": "happy" },
                { "id": 2, "date": format!("{}-{:02}-15", bucket.year, bucket.month), "moodEmoji": "calm" }
            ])
        });
        self.respond(value)
    }

    fn save_entry(&self, request: SaveEntryRequest) -> BoxFuture<'static, Result<CalendarEntry>> {
        let entry = CalendarEntry::from_value(json!({
            "id": 99,
            "date": request.date,
            "moodEmoji": request.mood_emoji,
            "note": request.note,
        }));
        match entry {
            Ok(entry) => self.respond(entry),
            Err(e) => async move { Err(e) }.boxed(),
        }
    }

    fn delete_entry(&self, _date: NaiveDate) -> BoxFuture<'static, Result<()>> {
        self.respond(())
    }
}
