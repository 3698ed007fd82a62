//! Request DTOs for the sidecar API
//!
//! Query strings and bodies accepted under `/_flix`.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::auth::AuthStatus;

/// Default page size for list reads
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size the sidecar will ask the backend for
pub const MAX_PAGE_SIZE: u32 = 100;

fn default_page() -> u32 {
    1
}

fn default_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Query for `GET /_flix/movies/:kind`
#[derive(Debug, Clone, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
    /// Bypass a fresh cached entry
    #[serde(default)]
    pub refresh: bool,
    /// Search text, required for the `search` kind
    #[serde(default)]
    pub q: Option<String>,
}

impl ListQuery {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.size == 0 || self.size > MAX_PAGE_SIZE {
            return Some(format!("size must be between 1 and {MAX_PAGE_SIZE}"));
        }
        None
    }
}

/// Query for `GET /_flix/calendar/:year/:month`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarQuery {
    /// Reload even if the bucket already has data
    #[serde(default)]
    pub force: bool,
}

/// Query for `DELETE /_flix/calendar/entry`
#[derive(Debug, Clone, Deserialize)]
pub struct DateQuery {
    pub date: NaiveDate,
}

/// Body of `POST /_flix/auth`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatusRequest {
    pub status: AuthStatus,
    /// Token to store alongside an `authenticated` status
    #[serde(default)]
    pub access_token: Option<String>,
}
