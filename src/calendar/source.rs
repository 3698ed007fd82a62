use chrono::NaiveDate;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::calendar::BucketKey;
use crate::error::Result;
use crate::models::{CalendarEntry, SaveEntryRequest};

/// Remote calendar operations used by the load coordinator.
pub trait CalendarSource: Send + Sync + 'static {
    /// Raw month response; decoding is left to the coordinator.
    fn fetch_month(&self, bucket: BucketKey) -> BoxFuture<'static, Result<Value>>;

    fn save_entry(&self, request: SaveEntryRequest) -> BoxFuture<'static, Result<CalendarEntry>>;

    fn delete_entry(&self, date: NaiveDate) -> BoxFuture<'static, Result<()>>;
}
