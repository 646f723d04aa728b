//! Snapshot Probe
//!
//! A [`DeviceProbe`] over signals a browser client reported as JSON. Field
//! names follow the browser APIs. A missing or `null` field means the API
//! was unavailable; `{"error": "..."}` means it threw.
//!
//! ```json
//! {
//!   "graphics": { "unmaskedVendor": "Apple", "unmaskedRenderer": "Apple M1" },
//!   "hardwareConcurrency": 8,
//!   "deviceMemory": 8,
//!   "platform": "MacIntel",
//!   "userAgent": "Mozilla/5.0 ... Chrome/120.0.0.0 Safari/537.36",
//!   "vendor": "Google Inc.",
//!   "timezone": "Europe/Berlin",
//!   "maxTouchPoints": 0,
//!   "storageQuota": { "error": "SecurityError" }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::repository::DeviceProbe;
use crate::domain::value_objects::GraphicsInfo;
use crate::error::{FingerprintResult, ProbeError};

/// Result of one reported API read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Probed<T> {
    Failed { error: String },
    Value(T),
}

impl<T> From<T> for Probed<T> {
    fn from(value: T) -> Self {
        Probed::Value(value)
    }
}

/// Reported browser signals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceSnapshot {
    pub graphics: Option<Probed<GraphicsInfo>>,
    pub hardware_concurrency: Option<Probed<u32>>,
    pub device_memory: Option<Probed<f64>>,
    pub platform: Option<Probed<String>>,
    pub user_agent: Option<Probed<String>>,
    pub vendor: Option<Probed<String>>,
    pub timezone: Option<Probed<String>>,
    pub max_touch_points: Option<Probed<u32>>,
    pub storage_quota: Option<Probed<u64>>,
    /// Error raised by `indexedDB.open`, if any
    pub indexed_db_error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotProbe {
    snapshot: DeviceSnapshot,
}

impl SnapshotProbe {
    pub fn new(snapshot: DeviceSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn from_json(json: &str) -> FingerprintResult<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn snapshot(&self) -> &DeviceSnapshot {
        &self.snapshot
    }
}

fn read<T: Clone>(api: &'static str, field: &Option<Probed<T>>) -> Result<Option<T>, ProbeError> {
    match field {
        None => Ok(None),
        Some(Probed::Value(value)) => Ok(Some(value.clone())),
        Some(Probed::Failed { error }) => Err(ProbeError::new(api, error.clone())),
    }
}

impl DeviceProbe for SnapshotProbe {
    async fn graphics(&self) -> Result<Option<GraphicsInfo>, ProbeError> {
        read("webgl", &self.snapshot.graphics)
    }

    fn hardware_concurrency(&self) -> Result<Option<u32>, ProbeError> {
        read("navigator.hardwareConcurrency", &self.snapshot.hardware_concurrency)
    }

    fn device_memory(&self) -> Result<Option<f64>, ProbeError> {
        read("navigator.deviceMemory", &self.snapshot.device_memory)
    }

    fn platform(&self) -> Result<Option<String>, ProbeError> {
        read("navigator.platform", &self.snapshot.platform)
    }

    fn user_agent(&self) -> Result<Option<String>, ProbeError> {
        read("navigator.userAgent", &self.snapshot.user_agent)
    }

    fn vendor(&self) -> Result<Option<String>, ProbeError> {
        read("navigator.vendor", &self.snapshot.vendor)
    }

    fn timezone(&self) -> Result<Option<String>, ProbeError> {
        read("Intl.DateTimeFormat", &self.snapshot.timezone)
    }

    fn max_touch_points(&self) -> Result<Option<u32>, ProbeError> {
        read("navigator.maxTouchPoints", &self.snapshot.max_touch_points)
    }

    async fn storage_quota(&self) -> Result<Option<u64>, ProbeError> {
        read("navigator.storage.estimate", &self.snapshot.storage_quota)
    }

    async fn open_indexed_db(&self) -> Result<(), ProbeError> {
        match &self.snapshot.indexed_db_error {
            Some(error) => Err(ProbeError::new("indexedDB.open", error.clone())),
            None => Ok(()),
        }
    }
}
