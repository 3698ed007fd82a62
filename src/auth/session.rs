//! Stored credential
//!
//! The access token survives restarts in a small JSON file. Its presence is
//! all the load gate looks at; validity is decided by the remote API.

use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CacheError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionData {
    pub access_token: String,
    pub saved_at: DateTime<Utc>,
}

/// Thread-safe holder for the access token, optionally backed by a file.
pub struct SessionStore {
    path: Option<PathBuf>,
    data: RwLock<Option<SessionData>>,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            data: RwLock::new(None),
        }
    }

    /// A session that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(None),
        }
    }

    /// Loads the session file if present. Returns true if a token was found.
    pub fn load(&self) -> Result<bool> {
        let Some(path) = &self.path else {
            return Ok(false);
        };
        if !path.exists() {
            return Ok(false);
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| CacheError::Storage(format!("failed to read session file: {e}")))?;
        let data: SessionData = serde_json::from_str(&contents)?;
        debug!(saved_at = %data.saved_at, "loaded stored session");
        self.replace(Some(data));
        Ok(true)
    }

    /// Stores `token` and writes the session file.
    pub fn set_token(&self, token: &str) -> Result<()> {
        let data = SessionData {
            access_token: token.to_string(),
            saved_at: Utc::now(),
        };
        self.save(&data)?;
        self.replace(Some(data));
        Ok(())
    }

    /// Forgets the token and removes the session file.
    pub fn clear(&self) -> Result<()> {
        self.replace(None);
        if let Some(path) = &self.path {
            if path.exists() {
                std::fs::remove_file(path).map_err(|e| {
                    CacheError::Storage(format!("failed to remove session file: {e}"))
                })?;
            }
        }
        Ok(())
    }

    pub fn token(&self) -> Option<String> {
        self.data
            .read()
            .ok()
            .and_then(|data| data.as_ref().map(|d| d.access_token.clone()))
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    fn replace(&self, next: Option<SessionData>) {
        if let Ok(mut data) = self.data.write() {
            *data = next;
        }
    }

    fn save(&self, data: &SessionData) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CacheError::Storage(format!("failed to create session dir: {e}")))?;
        }
        let contents = serde_json::to_string_pretty(data)?;
        std::fs::write(path, contents)
            .map_err(|e| CacheError::Storage(format!("failed to write session file: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("flixcache-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_in_memory_token() {
        let session = SessionStore::in_memory();
        assert!(!session.has_token());

        session.set_token("abc").unwrap();
        assert_eq!(session.token().as_deref(), Some("abc"));

        session.clear().unwrap();
        assert!(!session.has_token());
    }

    #[test]
    fn test_token_survives_reload() {
        let path = temp_path("reload.json");
        SessionStore::new(path.clone()).set_token("persisted").unwrap();

        let reloaded = SessionStore::new(path.clone());
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.token().as_deref(), Some("persisted"));

        reloaded.clear().unwrap();
        assert!(!path.exists());
        assert!(!SessionStore::new(path).load().unwrap());
    }
}
