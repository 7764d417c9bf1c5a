//! Persisted client state.
//!
//! Every value is JSON with an expiry. Two stores can be layered: reads try
//! the primary first, writes go to both.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ClientError;
use crate::shared::clock::{Clock, SystemClock};

/// Storage keys and their lifetimes.
pub mod keys {
    pub const PREFERENCES: &str = "blog_notification_prefs";
    pub const PERMISSION_ASKED: &str = "notification_permission_asked";
    pub const LAST_CHECK: &str = "last_blog_check";
    pub const USER_ID: &str = "notification_user_id";
    pub const HISTORY: &str = "notification_history";

    /// Preferences, user id, permission record and last check
    pub const LONG_TTL_DAYS: i64 = 365;
    pub const HISTORY_TTL_DAYS: i64 = 30;

    pub fn ttl_days(key: &str) -> i64 {
        if key == HISTORY {
            HISTORY_TTL_DAYS
        } else {
            LONG_TTL_DAYS
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entry {
    value: Value,
    expires_at: DateTime<Utc>,
}

impl Entry {
    fn new(value: Value, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: now + ttl,
        }
    }

    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// String-keyed JSON store with per-entry expiry.
pub trait KeyValueStore: Send + Sync {
    /// Unexpired value for `key`.
    fn get(&self, key: &str) -> Result<Option<Value>, ClientError>;

    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), ClientError>;

    fn remove(&self, key: &str) -> Result<(), ClientError>;
}

/// Process-local store.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Store whose expiry is judged by `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, ClientError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), ClientError> {
        let entry = Entry::new(value, self.clock.now(), ttl);
        self.entries.lock().insert(key.to_string(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON file.
///
/// The file is rewritten on every change through a temporary sibling and a
/// rename, so a crash never leaves a half-written document.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
    clock: Arc<dyn Clock>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, Arc::new(SystemClock))
    }

    pub fn with_clock(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<HashMap<String, Entry>, ClientError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, entries: &HashMap<String, Entry>) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, ClientError> {
        let _guard = self.lock.lock();
        let now = self.clock.now();
        Ok(self
            .read()?
            .remove(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value))
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), ClientError> {
        let _guard = self.lock.lock();
        let now = self.clock.now();
        let mut entries = self.read()?;
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(key.to_string(), Entry::new(value, now, ttl));
        self.write(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        let _guard = self.lock.lock();
        let mut entries = self.read()?;
        if entries.remove(key).is_some() {
            self.write(&entries)?;
        }
        Ok(())
    }
}

/// Primary store with a fallback.
///
/// A value present in the primary wins. Writes go to both and succeed if
/// either accepted them.
pub struct LayeredStore {
    primary: Box<dyn KeyValueStore>,
    fallback: Box<dyn KeyValueStore>,
}

impl LayeredStore {
    pub fn new(primary: impl KeyValueStore + 'static, fallback: impl KeyValueStore + 'static) -> Self {
        Self {
            primary: Box::new(primary),
            fallback: Box::new(fallback),
        }
    }
}

impl KeyValueStore for LayeredStore {
    fn get(&self, key: &str) -> Result<Option<Value>, ClientError> {
        match self.primary.get(key) {
            Ok(Some(value)) => return Ok(Some(value)),
            Ok(None) => {}
            Err(e) => tracing::warn!(key, error = %e, "Primary store read failed"),
        }
        self.fallback.get(key)
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), ClientError> {
        let primary = self.primary.set(key, value.clone(), ttl);
        let fallback = self.fallback.set(key, value, ttl);
        match (primary, fallback) {
            (Err(e), Err(_)) => Err(e),
            (Err(e), Ok(())) | (Ok(()), Err(e)) => {
                tracing::warn!(key, error = %e, "Store write partially failed");
                Ok(())
            }
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        let primary = self.primary.remove(key);
        self.fallback.remove(key)?;
        primary
    }
}

/// Typed access over a [`KeyValueStore`].
///
/// Failures are logged and swallowed; persisted state is best effort.
pub struct StateStore {
    inner: Box<dyn KeyValueStore>,
}

impl StateStore {
    pub fn new(inner: impl KeyValueStore + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    /// In-memory state, for tests and ephemeral clients.
    pub fn memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// In-memory state expiring against `clock`.
    pub fn memory_with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::new(MemoryStore::with_clock(clock))
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = match self.inner.get(key) {
            Ok(value) => value?,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to load client state");
                return None;
            }
        };
        serde_json::from_value(value)
            .map_err(|e| tracing::warn!(key, error = %e, "Discarding unreadable client state"))
            .ok()
    }

    pub fn save<T: Serialize>(&self, key: &str, value: &T) {
        let result = serde_json::to_value(value)
            .map_err(ClientError::from)
            .and_then(|value| self.inner.set(key, value, Duration::days(keys::ttl_days(key))));
        if let Err(e) = result {
            tracing::warn!(key, error = %e, "Failed to save client state");
        }
    }

    pub fn remove(&self, key: &str) {
        if let Err(e) = self.inner.remove(key) {
            tracing::warn!(key, error = %e, "Failed to remove client state");
        }
    }
}
