//! Persistent Fingerprint Cache
//!
//! Storage layout:
//!
//! | medium  | key                          | value                      |
//! |---------|------------------------------|----------------------------|
//! | durable | `device_fingerprint_cache`   | identifier (normal mode)   |
//! | durable | `device_fingerprint_expiry`  | expiry, Unix ms            |
//! | durable | `device_fingerprint_version` | algorithm version tag      |
//! | durable | `device_fingerprint_stable`  | JSON [`CacheEntry`] mirror |
//! | session | `device_fingerprint_stable`  | JSON [`CacheEntry`]        |
//!
//! Normal mode reads and writes the two durable keys. Private mode reads the
//! session entry, then the durable mirror. It writes the session entry and
//! mirrors it to durable storage on a best-effort basis. Every storage
//! failure is a miss.

use std::sync::Arc;

use platform::clock::{Clock, SystemClock};
use platform::storage::KeyValueStore;

use crate::application::config::FingerprintConfig;
use crate::domain::value_objects::{AlgorithmVersion, BrowsingMode, CacheEntry, FingerprintId};

pub const CACHE_KEY: &str = "device_fingerprint_cache";
pub const EXPIRY_KEY: &str = "device_fingerprint_expiry";
pub const VERSION_KEY: &str = "device_fingerprint_version";
pub const STABLE_KEY: &str = "device_fingerprint_stable";

/// Outcome of comparing the persisted version tag with the running one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheck {
    /// Stored tag matches
    Current,
    /// Stored tag differed or was missing; persisted entries were purged
    Invalidated { previous: Option<String> },
    /// Tag could not be read
    Unreadable,
}

pub struct FingerprintCache {
    durable: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    version: AlgorithmVersion,
    ttl_ms: i64,
}

impl FingerprintCache {
    pub fn new(
        durable: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        config: &FingerprintConfig,
    ) -> Self {
        Self {
            durable,
            session,
            clock: Arc::new(SystemClock),
            version: config.algorithm_version.clone(),
            ttl_ms: config.cache_ttl_ms(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // ========================================================================
    // Versioning
    // ========================================================================

    /// Purge persisted entries written by a different algorithm version
    pub fn check_version(&self) -> VersionCheck {
        let stored = match self.durable.get(VERSION_KEY) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::debug!(error = %e, "Cannot read fingerprint version tag");
                return VersionCheck::Unreadable;
            }
        };

        if stored.as_deref().is_some_and(|v| self.version.matches(v)) {
            return VersionCheck::Current;
        }

        tracing::info!(
            previous = stored.as_deref().unwrap_or("none"),
            current = %self.version,
            "Fingerprint algorithm version changed, purging cache"
        );
        self.purge();
        if let Err(e) = self.durable.set(VERSION_KEY, self.version.as_str()) {
            tracing::debug!(error = %e, "Cannot persist fingerprint version tag");
        }
        VersionCheck::Invalidated { previous: stored }
    }

    // ========================================================================
    // Entries
    // ========================================================================

    pub fn load(&self, mode: BrowsingMode) -> Option<FingerprintId> {
        match mode {
            BrowsingMode::Normal => self.load_durable(),
            BrowsingMode::Private => self.load_stable(),
        }
    }

    pub fn store(&self, mode: BrowsingMode, fingerprint: &FingerprintId) {
        let expires_at_ms = self.clock.now_ms().saturating_add(self.ttl_ms);
        let entry = CacheEntry::new(fingerprint.clone(), expires_at_ms);
        match mode {
            BrowsingMode::Normal => {
                let written = write(&*self.durable, CACHE_KEY, entry.fingerprint.as_str())
                    && write(&*self.durable, EXPIRY_KEY, &entry.expires_at_ms.to_string());
                if !written {
                    remove(&*self.durable, &[CACHE_KEY, EXPIRY_KEY]);
                }
            }
            BrowsingMode::Private => {
                let Ok(json) = serde_json::to_string(&entry) else {
                    return;
                };
                write(&*self.session, STABLE_KEY, &json);
                // some private modes still allow durable writes
                write(&*self.durable, STABLE_KEY, &json);
            }
        }
    }

    /// Remove every entry key from both media (the version tag stays)
    pub fn purge(&self) {
        remove(&*self.durable, &[CACHE_KEY, EXPIRY_KEY, STABLE_KEY]);
        remove(&*self.session, &[STABLE_KEY]);
    }

    fn load_durable(&self) -> Option<FingerprintId> {
        let id = read(&*self.durable, CACHE_KEY)?;
        let expiry = read(&*self.durable, EXPIRY_KEY)?;

        let entry = match (FingerprintId::parse(&id), expiry.trim().parse::<i64>()) {
            (Ok(fingerprint), Ok(expires_at_ms)) => CacheEntry::new(fingerprint, expires_at_ms),
            _ => {
                tracing::debug!("Discarding malformed cached fingerprint");
                remove(&*self.durable, &[CACHE_KEY, EXPIRY_KEY]);
                return None;
            }
        };

        if entry.is_expired(self.clock.now_ms()) {
            tracing::debug!(expires_at_ms = entry.expires_at_ms, "Cached fingerprint expired");
            remove(&*self.durable, &[CACHE_KEY, EXPIRY_KEY]);
            return None;
        }
        Some(entry.fingerprint)
    }

    fn load_stable(&self) -> Option<FingerprintId> {
        if let Some(entry) = self.read_stable(&*self.session) {
            return Some(entry.fingerprint);
        }
        let entry = self.read_stable(&*self.durable)?;
        if let Ok(json) = serde_json::to_string(&entry) {
            write(&*self.session, STABLE_KEY, &json);
        }
        Some(entry.fingerprint)
    }

    fn read_stable(&self, store: &dyn KeyValueStore) -> Option<CacheEntry> {
        let raw = read(store, STABLE_KEY)?;
        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if !entry.is_expired(self.clock.now_ms()) => Some(entry),
            Ok(_) => {
                tracing::debug!("Stable fingerprint expired");
                remove(store, &[STABLE_KEY]);
                None
            }
            Err(e) => {
                tracing::debug!(error = %e, "Discarding malformed stable fingerprint");
                remove(store, &[STABLE_KEY]);
                None
            }
        }
    }
}

fn read(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    store.get(key).unwrap_or_else(|e| {
        tracing::debug!(key, error = %e, "Cache read failed");
        None
    })
}

fn write(store: &dyn KeyValueStore, key: &str, value: &str) -> bool {
    match store.set(key, value) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(key, error = %e, "Cache write failed");
            false
        }
    }
}

fn remove(store: &dyn KeyValueStore, keys: &[&str]) {
    for key in keys {
        if let Err(e) = store.remove(key) {
            tracing::debug!(key, error = %e, "Cache remove failed");
        }
    }
}
