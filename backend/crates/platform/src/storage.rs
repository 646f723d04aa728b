//! Key/Value Storage Media
//!
//! String-keyed, string-valued storage with the same shape as browser
//! `localStorage` / `sessionStorage`:
//! - [`MemoryStore`] lives as long as the process (session-scoped medium)
//! - [`JsonFileStore`] persists to a JSON object on disk (durable medium)
//!
//! Every operation is fallible. Callers that only cache data are expected
//! to treat any [`StorageError`] as a miss.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

/// Storage failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Medium disabled or inaccessible
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Write would exceed the medium's quota
    #[error("Storage quota exceeded ({limit} bytes)")]
    QuotaExceeded { limit: usize },

    /// Underlying I/O failed
    #[error("Storage I/O failed: {0}")]
    Io(String),

    /// Persisted data could not be decoded
    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

/// Synchronous key/value medium
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-lifetime store
///
/// Can be switched off to simulate a browser with storage disabled, and can
/// carry a byte quota (keys + values) to simulate a full medium.
#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    available: AtomicBool,
    quota_bytes: Option<usize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            quota_bytes: None,
        }
    }

    /// Store whose every operation fails
    pub fn disabled() -> Self {
        let store = Self::new();
        store.set_available(false);
        store
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::new()
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored keys (0 when the store is unavailable)
    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn guard(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("storage disabled".to_string()));
        }
        self.entries
            .lock()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.guard()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.guard()?;
        if let Some(limit) = self.quota_bytes {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > limit {
                return Err(StorageError::QuotaExceeded { limit });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.guard()?.remove(key);
        Ok(())
    }
}

// ============================================================================
// JSON file store
// ============================================================================

/// Durable store backed by a single JSON object file
///
/// The whole file is rewritten on every mutation (write to a sibling temp
/// file, then rename). A missing file reads as an empty store.
///
/// Every call does blocking `std::fs` I/O on the calling thread, including
/// from async callers. Meant for a small file touched a few times per
/// process, not for hot paths or large data sets.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "Storage file is corrupt");
            StorageError::Corrupt(e.to_string())
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let body =
            serde_json::to_string_pretty(entries).map_err(|e| StorageError::Io(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn locked<T>(
        &self,
        f: impl FnOnce(&Self) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned".to_string()))?;
        f(self)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.locked(|s| Ok(s.read_all()?.get(key).cloned()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.locked(|s| {
            let mut entries = s.read_all()?;
            entries.insert(key.to_string(), value.to_string());
            s.write_all(&entries)
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.locked(|s| {
            let mut entries = s.read_all()?;
            if entries.remove(key).is_some() {
                s.write_all(&entries)?;
            }
            Ok(())
        })
    }
}
