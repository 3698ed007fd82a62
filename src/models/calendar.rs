//! Calendar wire DTOs and the entry shape handed to the UI.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{CacheError, Result};

/// Movie attached to a calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedMovie {
    pub id: Option<i64>,
    pub tmdb_id: Option<i64>,
    pub title: Option<String>,
    pub poster_url: Option<String>,
    pub genre: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
}

/// A calendar entry as the remote API returns it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntryDto {
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub mood_emoji: Option<String>,
    pub note: Option<String>,
    pub share_uuid: Option<String>,
    #[serde(default)]
    pub recommendations: Option<Vec<Value>>,
    pub selected_movie: Option<SelectedMovie>,
}

/// One day of a month bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
    pub id: Option<i64>,
    /// Day of month, 1-based
    pub day: u32,
    pub date: NaiveDate,
    pub mood: Option<String>,
    pub notes: Option<String>,
    pub share_uuid: Option<String>,
    pub recommendations: Vec<Value>,
    pub selected_movie: Option<SelectedMovie>,
}

impl From<CalendarEntryDto> for CalendarEntry {
    fn from(dto: CalendarEntryDto) -> Self {
        Self {
            id: dto.id,
            day: dto.date.day(),
            date: dto.date,
            mood: dto.mood_emoji,
            notes: dto.note,
            share_uuid: dto.share_uuid,
            recommendations: dto.recommendations.unwrap_or_default(),
            selected_movie: dto.selected_movie,
        }
    }
}

impl CalendarEntry {
    /// Decodes a single entry body.
    pub fn from_value(value: Value) -> Result<Self> {
        let dto: CalendarEntryDto = serde_json::from_value(value)
            .map_err(|e| CacheError::Decode(format!("calendar entry: {e}")))?;
        Ok(dto.into())
    }
}

/// Decodes a month response. Anything but an array yields no entries;
/// elements that fail to decode are skipped.
pub fn entries_from_month(value: Value) -> Vec<CalendarEntry> {
    let Value::Array(items) = value else {
        debug!("month response is not an array, treating as empty");
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match CalendarEntry::from_value(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(error = %e, "skipping malformed calendar entry");
                None
            }
        })
        .collect()
}

/// Body of `POST /api/calendar/entry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveEntryRequest {
    pub date: NaiveDate,
    pub mood_emoji: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub movie_id: Option<i64>,
}
