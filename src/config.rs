//! Configuration Module
//!
//! Handles loading and managing sidecar configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Application name used for data directory paths
const APP_NAME: &str = "flixcache";

/// Sentinel `STORE_PATH` value selecting the in-memory store backend
pub const MEMORY_STORE: &str = ":memory:";

/// Sidecar configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Origin the UI is served from; requests under it are "same-origin"
    pub app_origin: String,
    /// Where same-origin requests are forwarded
    pub upstream_url: String,
    /// Path prefix identifying the application's JSON API
    pub api_prefix: String,
    /// Suffix for the versioned persistent store names
    pub cache_version: String,
    /// Maximum entries kept in the image store
    pub image_cache_limit: usize,
    /// Maximum entries kept in the detail cache
    pub detail_cache_capacity: usize,
    /// TTL in seconds for list/page data
    pub list_ttl: u64,
    /// TTL in seconds for detail sub-resources
    pub detail_ttl: u64,
    /// Remote call timeout in seconds
    pub request_timeout: u64,
    /// Stale-entry sweep interval in seconds
    pub cleanup_interval: u64,
    /// SQLite path for persistent stores, or `:memory:`
    pub store_path: String,
    /// Path of the stored-credential session file
    pub session_path: PathBuf,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` (default: 3000)
    /// - `APP_ORIGIN` (default: http://localhost:3000)
    /// - `UPSTREAM_URL` (default: http://localhost:8080)
    /// - `API_PREFIX` (default: /api/)
    /// - `CACHE_VERSION` (default: v1)
    ///
    /// Limits, TTLs, the timeout and the sweep interval must be positive; a
    /// zero is replaced by the default.
    ///
    /// - `IMAGE_CACHE_LIMIT` (default: 300)
    /// - `DETAIL_CACHE_CAPACITY` (default: 500)
    /// - `LIST_TTL_SECS` (default: 1800)
    /// - `DETAIL_TTL_SECS` (default: 3600)
    /// - `REQUEST_TIMEOUT_SECS` (default: 10)
    /// - `CLEANUP_INTERVAL` (default: 60)
    /// - `STORE_PATH` (default: `<data_dir>/flixcache/stores.db`)
    /// - `SESSION_PATH` (default: `<data_dir>/flixcache/session.json`)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            app_origin: env::var("APP_ORIGIN").unwrap_or(defaults.app_origin),
            upstream_url: env::var("UPSTREAM_URL").unwrap_or(defaults.upstream_url),
            api_prefix: env::var("API_PREFIX").unwrap_or(defaults.api_prefix),
            cache_version: env::var("CACHE_VERSION").unwrap_or(defaults.cache_version),
            image_cache_limit: parse_positive("IMAGE_CACHE_LIMIT", defaults.image_cache_limit),
            detail_cache_capacity: parse_positive(
                "DETAIL_CACHE_CAPACITY",
                defaults.detail_cache_capacity,
            ),
            list_ttl: parse_positive("LIST_TTL_SECS", defaults.list_ttl),
            detail_ttl: parse_positive("DETAIL_TTL_SECS", defaults.detail_ttl),
            request_timeout: parse_positive("REQUEST_TIMEOUT_SECS", defaults.request_timeout),
            cleanup_interval: parse_positive("CLEANUP_INTERVAL", defaults.cleanup_interval),
            store_path: env::var("STORE_PATH").unwrap_or(defaults.store_path),
            session_path: env::var("SESSION_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_path),
        }
    }

    pub fn list_ttl(&self) -> Duration {
        Duration::from_secs(self.list_ttl)
    }

    pub fn detail_ttl(&self) -> Duration {
        Duration::from_secs(self.detail_ttl)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// True when persistent stores should live in process memory only.
    pub fn uses_memory_store(&self) -> bool {
        self.store_path == MEMORY_STORE
    }

    fn data_dir() -> PathBuf {
        dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

fn parse_positive<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + Default + PartialEq,
{
    positive_or(name, parse_var(name), default)
}

/// Keeps `value` unless it is missing or zero.
fn positive_or<T: Default + PartialEq>(name: &str, value: Option<T>, default: T) -> T {
    match value {
        Some(v) if v == T::default() => {
            warn!(var = name, "zero is not allowed, using the default");
            default
        }
        Some(v) => v,
        None => default,
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = Self::data_dir();
        Self {
            server_port: 3000,
            app_origin: "http://localhost:3000".to_string(),
            upstream_url: "http://localhost:8080".to_string(),
            api_prefix: "/api/".to_string(),
            cache_version: "v1".to_string(),
            image_cache_limit: 300,
            detail_cache_capacity: 500,
            list_ttl: 30 * 60,
            detail_ttl: 60 * 60,
            request_timeout: 10,
            cleanup_interval: 60,
            store_path: data_dir.join("stores.db").to_string_lossy().into_owned(),
            session_path: data_dir.join("session.json"),
        }
    }
}
