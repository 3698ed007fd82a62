//! Response DTOs for the sidecar API
//!
//! Defines the structure of outgoing `/_flix` response bodies.

use serde::Serialize;

use crate::auth::AuthStatus;
use crate::cache::CacheStats;
use crate::calendar::{BucketSnapshot, LoadOutcome};
use crate::proxy::Lifecycle;
use crate::store::StoreCounts;

/// Response body for `GET /_flix/stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Response Cache counters
    pub responses: CacheStats,
    /// Detail Cache counters
    pub details: CacheStats,
    /// Entry counts of the persistent stores
    pub stores: StoreCounts,
    /// Response Cache hits / (hits + misses)
    pub response_hit_rate: f64,
    /// Detail Cache hits / (hits + misses)
    pub detail_hit_rate: f64,
}

impl StatsResponse {
    /// Creates a StatsResponse, deriving the hit rates from the counters
    pub fn new(responses: CacheStats, details: CacheStats, stores: StoreCounts) -> Self {
        Self {
            response_hit_rate: responses.hit_rate(),
            detail_hit_rate: details.hit_rate(),
            responses,
            details,
            stores,
        }
    }
}

/// Response body for `GET /_flix/health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Interception agent lifecycle state
    pub agent: Lifecycle,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy(agent: Lifecycle) -> Self {
        Self {
            status: "healthy".to_string(),
            agent,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for `GET /_flix/calendar/:year/:month`
#[derive(Debug, Clone, Serialize)]
pub struct BucketResponse {
    /// What the load request did
    pub outcome: &'static str,
    #[serde(flatten)]
    pub snapshot: BucketSnapshot,
}

impl BucketResponse {
    pub fn new(outcome: &LoadOutcome, snapshot: BucketSnapshot) -> Self {
        let outcome = match outcome {
            LoadOutcome::Loaded(_) => "loaded",
            LoadOutcome::Failed(_) => "failed",
            LoadOutcome::AlreadyLoaded => "already_loaded",
            LoadOutcome::AlreadyLoading => "already_loading",
            LoadOutcome::AwaitingAuth => "awaiting_auth",
            LoadOutcome::Discarded => "discarded",
        };
        Self { outcome, snapshot }
    }
}

/// Response body for `POST /_flix/auth`
#[derive(Debug, Clone, Serialize)]
pub struct AuthStatusResponse {
    pub status: AuthStatus,
    /// Whether calendar loads may start
    pub gate_open: bool,
}

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
