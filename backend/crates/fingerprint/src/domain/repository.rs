//! Repository Traits
//!
//! Interfaces to the environment and the backend. Implementations live in
//! the infrastructure layer.

use kernel::id::UserId;

use crate::domain::entities::TrialUsage;
use crate::domain::value_objects::{FingerprintId, GraphicsInfo};
use crate::error::{FingerprintResult, ProbeError};

/// Reads device and browser signals
///
/// `Ok(None)` means the API is absent or unsupported; `Err` means it threw.
#[trait_variant::make(DeviceProbe: Send)]
pub trait LocalDeviceProbe {
    /// WebGL parameters from a hidden canvas; `None` without a WebGL context
    async fn graphics(&self) -> Result<Option<GraphicsInfo>, ProbeError>;

    fn hardware_concurrency(&self) -> Result<Option<u32>, ProbeError>;

    /// Approximate RAM in GiB (may be fractional, e.g. 0.5)
    fn device_memory(&self) -> Result<Option<f64>, ProbeError>;

    fn platform(&self) -> Result<Option<String>, ProbeError>;

    fn user_agent(&self) -> Result<Option<String>, ProbeError>;

    fn vendor(&self) -> Result<Option<String>, ProbeError>;

    /// IANA time zone name
    fn timezone(&self) -> Result<Option<String>, ProbeError>;

    fn max_touch_points(&self) -> Result<Option<u32>, ProbeError>;

    /// Storage quota estimate in bytes
    async fn storage_quota(&self) -> Result<Option<u64>, ProbeError>;

    /// Try to open an IndexedDB database
    async fn open_indexed_db(&self) -> Result<(), ProbeError>;
}

/// Backend procedures tracking anonymous trial usage per device
#[trait_variant::make(TrialUsageRepository: Send)]
pub trait LocalTrialUsageRepository {
    /// `check_device_fingerprint_usage`
    async fn check_usage(&self, fingerprint: &FingerprintId) -> FingerprintResult<TrialUsage>;

    /// `associate_device_fingerprint_to_user`; `true` when the backend linked them
    async fn associate_to_user(
        &self,
        fingerprint: &FingerprintId,
        user_id: &UserId,
    ) -> FingerprintResult<bool>;
}
