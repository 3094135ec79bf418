//! Storage layer for the time diary.
//!
//! Provides a SQLite-backed [`KeyValueStore`] using `rusqlite`.
//!
//! # Thread Safety
//!
//! `rusqlite::Connection` is `Send` but not `Sync`. [`Database`] keeps its
//! connection behind a `Mutex` so a single instance can be shared by the
//! tracker and its tick thread.
//!
//! # Schema
//!
//! A single `kv` table maps each storage key to a JSON-encoded value.
//! `updated_at` records the last write in ISO 8601 (e.g.
//! `2024-01-15T10:30:00Z`) for debugging; the core never reads it.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use td_core::{KeyValueStore, StoreError};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The database directory could not be created.
    #[error("failed to create database directory {path}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        Self::new(err)
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens a database at the given path, creating it and its parent
    /// directory if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| DbError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        tracing::debug!(path = %path.display(), "opened database");
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn().execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the stored value for `key`.
    pub fn get(&self, key: &str) -> Result<Option<String>, DbError> {
        let value = self
            .conn()
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Inserts or replaces the value for `key`.
    pub fn put(&self, key: &str, value: &str) -> Result<(), DbError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        self.conn().execute(
            "
            INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, value, now],
        )?;
        Ok(())
    }

    /// Deletes `key`. Returns whether a row was removed.
    pub fn delete(&self, key: &str) -> Result<bool, DbError> {
        let removed = self.conn().execute("DELETE FROM kv WHERE key = ?", [key])?;
        Ok(removed > 0)
    }

    /// Deletes every key.
    pub fn delete_all(&self) -> Result<usize, DbError> {
        let removed = self.conn().execute("DELETE FROM kv", [])?;
        tracing::debug!(removed, "cleared database");
        Ok(removed)
    }

    /// Lists stored keys in ascending order.
    pub fn list_keys(&self) -> Result<Vec<String>, DbError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

impl KeyValueStore for Database {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get(key)?)
    }

    fn put_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        Ok(self.put(key, value)?)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.delete(key)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.delete_all()?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.list_keys()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use td_core::{Calendar, Gateway, ManualClock, Tracker, TimerStatus};

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");
        let conn = db.conn();
        let mut stmt = conn.prepare("PRAGMA table_info(kv)").unwrap();
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get(1))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(columns, vec!["key", "value", "updated_at"]);
    }

    #[test]
    fn put_get_overwrite_delete() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get("categories").unwrap(), None);

        db.put("categories", "[]").unwrap();
        db.put("categories", "[1]").unwrap();
        assert_eq!(db.get("categories").unwrap().as_deref(), Some("[1]"));

        assert!(db.delete("categories").unwrap());
        assert!(!db.delete("categories").unwrap());
        assert_eq!(db.get("categories").unwrap(), None);
    }

    #[test]
    fn clear_removes_every_key() {
        let db = Database::open_in_memory().unwrap();
        db.put("b", "1").unwrap();
        db.put("a", "2").unwrap();
        assert_eq!(db.list_keys().unwrap(), vec!["a", "b"]);

        assert_eq!(db.delete_all().unwrap(), 2);
        assert!(db.list_keys().unwrap().is_empty());
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("td.db");

        {
            let db = Database::open(&path).unwrap();
            db.put("use24HourFormat", "true").unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.get("use24HourFormat").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn gateway_round_trips_json() {
        let gateway = Gateway::new(Arc::new(Database::open_in_memory().unwrap()));
        gateway.save("numbers", &[1, 2, 3]).unwrap();
        assert_eq!(gateway.load::<Vec<i32>>("numbers"), Some(vec![1, 2, 3]));

        let db = Database::open_in_memory().unwrap();
        db.put("broken", "{not json").unwrap();
        let gateway = Gateway::new(Arc::new(db));
        assert_eq!(gateway.load::<serde_json::Value>("broken"), None);
    }

    #[test]
    fn running_timer_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("td.db");
        let t0 = chrono::DateTime::parse_from_rfc3339("2024-01-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let clock = Arc::new(ManualClock::new(t0));

        {
            let gateway = Gateway::new(Arc::new(Database::open(&path).unwrap()));
            let mut tracker = Tracker::open(gateway, clock.clone(), Calendar::utc());
            let work = tracker.categories().find_by_name("Work").unwrap().id;
            tracker.start(work).unwrap();
        }

        clock.advance(chrono::Duration::minutes(30));
        let gateway = Gateway::new(Arc::new(Database::open(&path).unwrap()));
        let mut tracker = Tracker::open(gateway, clock, Calendar::utc());
        assert_eq!(tracker.timer_state().status, TimerStatus::Running);
        assert_eq!(tracker.current_elapsed(), chrono::Duration::minutes(30));

        let entry = tracker.stop().unwrap();
        assert_eq!(entry.duration(), chrono::Duration::minutes(30));
        assert_eq!(tracker.categories().all().len(), 8);
    }
}
