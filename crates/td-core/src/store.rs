//! Key-value persistence.
//!
//! Everything the core persists goes through a [`Gateway`], which encodes
//! values as JSON blobs on top of a [`KeyValueStore`] backend. Reads are
//! forgiving: a missing key and an undecodable blob both come back as "no
//! prior value". Writes report failures so callers can log them; in-memory
//! state stays authoritative either way.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Storage keys used by the core.
pub mod keys {
    pub const TIME_ENTRIES: &str = "timeEntries";
    pub const CATEGORIES: &str = "categories";
    pub const CURRENT_TIMER_STATE: &str = "currentTimerState";
    pub const TOTAL_TIME_TRACKED: &str = "totalTimeTracked";
    pub const FIRST_ENTRY_DATE: &str = "firstEntryDate";
    pub const USE_24_HOUR_FORMAT: &str = "use24HourFormat";
    pub const ENABLE_NOTIFICATIONS: &str = "enableNotifications";
    pub const NOTIFICATION_TIME: &str = "notificationTime";
}

/// Error raised by a storage backend.
#[derive(Debug, Error)]
#[error("storage backend error: {0}")]
pub struct StoreError(#[source] Box<dyn std::error::Error + Send + Sync>);

impl StoreError {
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(err.into())
    }
}

/// A string-keyed blob store.
pub trait KeyValueStore: Send + Sync {
    /// Returns the raw value for `key`, or `None` if it was never written.
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn put_raw(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Removes every key.
    fn clear(&self) -> Result<(), StoreError>;

    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// In-process store, used by tests and headless hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values().get(key).cloned())
    }

    fn put_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.values().clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.values().keys().cloned().collect())
    }
}

/// Failure to persist a value.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to encode value for {key}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {key}")]
    Write {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to clear storage")]
    Clear(#[source] StoreError),
}

/// Typed access to a [`KeyValueStore`].
#[derive(Clone)]
pub struct Gateway {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway").finish_non_exhaustive()
    }
}

impl Gateway {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// A gateway over a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Encodes `value` as JSON and writes it under `key`.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), PersistError> {
        let json = serde_json::to_string(value).map_err(|source| PersistError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.store
            .put_raw(key, &json)
            .map_err(|source| PersistError::Write {
                key: key.to_string(),
                source,
            })
    }

    /// Reads and decodes the value under `key`.
    ///
    /// Backend errors and undecodable blobs are logged and treated as absent.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get_raw(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to read stored value");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, error = %err, "discarding undecodable stored value");
                None
            }
        }
    }

    pub fn remove(&self, key: &str) -> Result<(), PersistError> {
        self.store
            .remove(key)
            .map_err(|source| PersistError::Write {
                key: key.to_string(),
                source,
            })
    }

    /// Removes every stored key.
    pub fn clear_all(&self) -> Result<(), PersistError> {
        self.store.clear().map_err(PersistError::Clear)
    }

    pub fn save_bool(&self, key: &str, value: bool) -> Result<(), PersistError> {
        self.save(key, &value)
    }

    /// Reads a flag, falling back to `default` when unset.
    pub fn load_bool(&self, key: &str, default: bool) -> bool {
        self.load(key).unwrap_or(default)
    }

    pub fn save_f64(&self, key: &str, value: f64) -> Result<(), PersistError> {
        self.save(key, &value)
    }

    pub fn load_f64(&self, key: &str) -> Option<f64> {
        self.load(key)
    }

    pub fn save_date(&self, key: &str, value: DateTime<Utc>) -> Result<(), PersistError> {
        self.save(key, &value)
    }

    pub fn load_date(&self, key: &str) -> Option<DateTime<Utc>> {
        self.load(key)
    }

    pub fn save_string(&self, key: &str, value: &str) -> Result<(), PersistError> {
        self.save(key, value)
    }

    pub fn load_string(&self, key: &str) -> Option<String> {
        self.load(key)
    }
}

/// Logs a failed write. In-memory state stays authoritative.
pub(crate) fn log_failure(result: Result<(), PersistError>) {
    if let Err(err) = result {
        let cause = std::error::Error::source(&err).map(ToString::to_string);
        tracing::warn!(error = %err, cause = cause.as_deref(), "failed to persist state");
    }
}
