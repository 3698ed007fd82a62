//! Year-month bucket keys.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::{CacheError, Result};

/// A calendar month. `month` is 1-based, matching the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BucketKey {
    pub year: i32,
    pub month: u32,
}

impl BucketKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(CacheError::InvalidRequest(format!(
                "month must be 1-12, got {month}"
            )));
        }
        Ok(Self { year, month })
    }

    /// The bucket containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                month: self.month + 1,
                ..self
            }
        }
    }

    pub fn prev(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                month: self.month - 1,
                ..self
            }
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_bounds() {
        assert!(BucketKey::new(2025, 0).is_err());
        assert!(BucketKey::new(2025, 13).is_err());
        assert!(BucketKey::new(2025, 12).is_ok());
    }

    #[test]
    fn test_from_date_and_display() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let key = BucketKey::from_date(date);
        assert_eq!(key, BucketKey { year: 2025, month: 3 });
        assert_eq!(key.to_string(), "2025-3");
    }

    #[test]
    fn test_next_and_prev_wrap_years() {
        let dec = BucketKey::new(2024, 12).unwrap();
        let jan = BucketKey::new(2025, 1).unwrap();
        assert_eq!(dec.next(), jan);
        assert_eq!(jan.prev(), dec);
        assert_eq!(jan.next().prev(), jan);
    }
}
