//! SQLite-backed durable store.

use super::backend::DurableStore;
use crate::{Error, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Durable key/value store in a single SQLite table.
///
/// The connection is opened lazily on first use. Concurrent callers share one
/// connection behind the mutex, so opening happens at most once.
pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            conn: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(path: &Path) -> Result<Connection> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::StorageUnavailable(format!(
                    "Could not create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::StorageUnavailable(format!("{}: {}", path.display(), e)))?;
        Self::init_schema(&conn).map_err(|e| Error::StorageUnavailable(e.to_string()))?;
        Ok(conn)
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                seq INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );
            "#,
        )
    }

    fn with_conn<R>(&self, f: impl FnOnce(&Connection) -> Result<R>) -> Result<R> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| Error::StorageUnavailable("connection lock poisoned".to_string()))?;
        if guard.is_none() {
            *guard = Some(Self::open(&self.path)?);
        }
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(Error::StorageUnavailable(
                "connection was not opened".to_string(),
            )),
        }
    }

    /// Whether the database currently runs in WAL journal mode.
    pub fn is_persistent(&self) -> bool {
        self.with_conn(|conn| {
            let mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
            Ok(mode.eq_ignore_ascii_case("wal"))
        })
        .unwrap_or(false)
    }

    /// Number of stored keys.
    pub fn key_count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }
}

impl DurableStore for SqliteStore {
    fn init(&self) -> Result<()> {
        self.with_conn(|_| Ok(()))
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        self.with_conn(|conn| {
            let text: Option<String> = conn
                .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()?;
            match text {
                Some(text) => Ok(Some(serde_json::from_str(&text)?)),
                None => Ok(None),
            }
        })
    }

    fn set(&self, key: &str, value: &Value, seq: u64) -> Result<bool> {
        let text = serde_json::to_string(value)?;
        self.with_conn(|conn| {
            let changed = conn
                .execute(
                    r#"
                    INSERT INTO kv (key, value, seq, updated_at) VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        seq = excluded.seq,
                        updated_at = excluded.updated_at
                    WHERE excluded.seq > kv.seq
                    "#,
                    params![key, text, seq as i64, Utc::now().to_rfc3339()],
                )
                .map_err(|e| Error::Write(format!("{}: {}", key, e)))?;
            Ok(changed > 0)
        })
    }

    fn last_seq(&self, key: &str) -> Result<Option<u64>> {
        self.with_conn(|conn| {
            let seq: Option<i64> = conn
                .query_row("SELECT seq FROM kv WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(seq.map(|s| s as u64))
        })
    }

    fn request_persistence(&self) -> bool {
        let granted = self.with_conn(|conn| {
            let mode: String =
                conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
            conn.execute_batch("PRAGMA synchronous = FULL;")?;
            Ok(mode.eq_ignore_ascii_case("wal"))
        });
        match granted {
            Ok(granted) => {
                tracing::debug!(granted, "persistent storage requested");
                granted
            }
            Err(e) => {
                tracing::debug!(error = %e, "persistent storage request failed");
                false
            }
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, SqliteStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::new(temp_dir.path().join("nested").join("keystone.db"));
        (temp_dir, store)
    }

    #[test]
    fn test_lazy_init_creates_database() {
        let (_temp, store) = create_test_store();
        assert!(!store.path().exists());
        store.init().unwrap();
        assert!(store.path().exists());
        store.init().unwrap();
    }

    #[test]
    fn test_get_missing_key() {
        let (_temp, store) = create_test_store();
        assert_eq!(store.get("projects").unwrap(), None);
    }

    #[test]
    fn test_set_then_get() {
        let (_temp, store) = create_test_store();
        let value = json!([{ "id": "prj-1", "title": "Robot" }]);
        assert!(store.set("projects", &value, 1).unwrap());
        assert_eq!(store.get("projects").unwrap(), Some(value));
        assert_eq!(store.last_seq("projects").unwrap(), Some(1));
    }

    #[test]
    fn test_stale_write_is_discarded() {
        let (_temp, store) = create_test_store();
        assert!(store.set("projects", &json!(["new"]), 10).unwrap());
        assert!(!store.set("projects", &json!(["old"]), 5).unwrap());
        assert!(!store.set("projects", &json!(["same"]), 10).unwrap());
        assert_eq!(store.get("projects").unwrap(), Some(json!(["new"])));
    }

    #[test]
    fn test_keys_are_independent() {
        let (_temp, store) = create_test_store();
        store.set("projects", &json!([]), 3).unwrap();
        assert!(store.set("selected-project", &json!("prj-1"), 1).unwrap());
        assert_eq!(store.key_count().unwrap(), 2);
    }

    #[test]
    fn test_request_persistence_enables_wal() {
        let (_temp, store) = create_test_store();
        assert!(store.request_persistence());
        assert!(store.is_persistent());
    }

    #[test]
    fn test_unavailable_when_path_is_directory() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::new(temp_dir.path());
        let err = store.init().unwrap_err();
        assert!(matches!(err, Error::StorageUnavailable(_)));
        assert!(!store.request_persistence());
    }

    #[test]
    fn test_concurrent_first_use_converges() {
        let (_temp, store) = create_test_store();
        let store = Arc::new(store);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.set(&format!("k{}", i), &json!(i), 1).unwrap())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(store.key_count().unwrap(), 8);
    }
}
