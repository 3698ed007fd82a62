//! SQLite-backed persistent stores.
//!
//! Survives restarts. Insertion order is the row sequence number, and
//! `INSERT OR REPLACE` assigns a fresh sequence number on rewrite.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{CacheError, Result};
use crate::proxy::ProxyResponse;
use crate::store::StoreBackend;

const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS stores (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS entries (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    store TEXT NOT NULL,
    request_key TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    stored_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (store, request_key)
);

CREATE INDEX IF NOT EXISTS idx_entries_store ON entries(store, seq);
"#;

pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Opens (or creates) the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::Storage(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            CacheError::Storage(format!("failed to open {}: {}", path.display(), e))
        })?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(STORE_SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CacheError::Storage(format!("lock poisoned: {e}")))
    }
}

impl StoreBackend for SqliteBackend {
    fn store_names(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn open(&self, store: &str) -> Result<()> {
        self.lock()?
            .execute("INSERT OR IGNORE INTO stores (name) VALUES (?)", params![store])?;
        Ok(())
    }

    fn get(&self, store: &str, key: &str) -> Result<Option<ProxyResponse>> {
        let conn = self.lock()?;
        let row: Option<(u16, String, Vec<u8>)> = conn
            .query_row(
                "SELECT status, headers, body FROM entries WHERE store = ? AND request_key = ?",
                params![store, key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        row.map(|(status, headers, body)| {
            Ok(ProxyResponse {
                status,
                headers: serde_json::from_str(&headers)?,
                body,
            })
        })
        .transpose()
    }

    fn put(&self, store: &str, key: &str, response: &ProxyResponse) -> Result<()> {
        let headers = serde_json::to_string(&response.headers)?;
        let conn = self.lock()?;
        conn.execute("INSERT OR IGNORE INTO stores (name) VALUES (?)", params![store])?;
        conn.execute(
            "INSERT OR REPLACE INTO entries (store, request_key, status, headers, body)
             VALUES (?, ?, ?, ?, ?)",
            params![store, key, response.status, headers, response.body],
        )?;
        Ok(())
    }

    fn delete(&self, store: &str, key: &str) -> Result<bool> {
        let removed = self.lock()?.execute(
            "DELETE FROM entries WHERE store = ? AND request_key = ?",
            params![store, key],
        )?;
        Ok(removed > 0)
    }

    fn keys(&self, store: &str) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT request_key FROM entries WHERE store = ? ORDER BY seq")?;
        let keys = stmt
            .query_map(params![store], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn len(&self, store: &str) -> Result<usize> {
        let count: i64 = self.lock()?.query_row(
            "SELECT COUNT(*) FROM entries WHERE store = ?",
            params![store],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn delete_store(&self, store: &str) -> Result<bool> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM entries WHERE store = ?", params![store])?;
        let removed = conn.execute("DELETE FROM stores WHERE name = ?", params![store])?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> SqliteBackend {
        SqliteBackend::open_in_memory().unwrap()
    }

    #[test]
    fn test_round_trips_status_headers_and_body() {
        let backend = backend();
        let mut resp = ProxyResponse::new(200, "image/png", vec![0u8, 159, 146, 150]);
        resp.headers.push(("etag".to_string(), "\"abc\"".to_string()));

        backend.put("moodflix-images-v1", "GET /a.png", &resp).unwrap();
        let loaded = backend.get("moodflix-images-v1", "GET /a.png").unwrap();

        assert_eq!(loaded, Some(resp));
    }

    #[test]
    fn test_rewrite_moves_key_to_newest() {
        let backend = backend();
        let resp = ProxyResponse::new(200, "text/plain", "x");
        for key in ["a", "b", "c", "a"] {
            backend.put("s", key, &resp).unwrap();
        }

        assert_eq!(backend.keys("s").unwrap(), vec!["b", "c", "a"]);
        assert_eq!(backend.len("s").unwrap(), 3);
    }

    #[test]
    fn test_delete_store_removes_entries() {
        let backend = backend();
        let resp = ProxyResponse::new(200, "text/plain", "x");
        backend.put("old", "a", &resp).unwrap();
        backend.open("new").unwrap();

        assert_eq!(backend.store_names().unwrap(), vec!["new", "old"]);
        assert!(backend.delete_store("old").unwrap());
        assert_eq!(backend.get("old", "a").unwrap(), None);
        assert_eq!(backend.store_names().unwrap(), vec!["new"]);
    }

    #[test]
    fn test_delete_entry() {
        let backend = backend();
        let resp = ProxyResponse::new(200, "text/plain", "x");
        backend.put("s", "a", &resp).unwrap();

        assert!(backend.delete("s", "a").unwrap());
        assert!(!backend.delete("s", "a").unwrap());
        assert_eq!(backend.len("s").unwrap(), 0);
    }
}
