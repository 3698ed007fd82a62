//! Calendar Module
//!
//! Month-bucketed calendar data behind the `LoadCoordinator`.

mod bucket;
mod coordinator;
mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use bucket::BucketKey;
pub use coordinator::{BucketSnapshot, BucketState, LoadCoordinator, LoadOutcome};
pub use source::CalendarSource;
