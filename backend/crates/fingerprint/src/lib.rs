//! Device Fingerprint Module
//!
//! Derives a stable, anonymous device identifier from environment signals
//! so that per-device quotas (anonymous trial usage) can be enforced
//! without an account.
//!
//! Clean Architecture structure:
//! - `domain/` - Signal derivation, hashing, value objects, repository traits
//! - `application/` - Generation, caching, private-mode detection, trial usage
//! - `infra/` - Device probes and the Supabase RPC client
//!
//! ## Identifier
//! `SHA-256(gpu|cores|memory|platform|ua|vendor|timezone|touch|salt)` as 64
//! lowercase hex characters. Generation never fails: every unavailable
//! signal degrades to a fixed fallback string.

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;

// Re-exports for convenience
pub use application::config::{FingerprintConfig, SupabaseConfig};
pub use application::generate::DeviceFingerprinter;
pub use application::trial_usage::TrialUsageService;
pub use domain::entities::{DeviceInfo, TrialUsage};
pub use domain::value_objects::{BrowsingMode, FingerprintId, validate_fingerprint};
pub use error::{FingerprintError, FingerprintResult};
pub use infra::host::HostProbe;
pub use infra::snapshot::{DeviceSnapshot, SnapshotProbe};
pub use infra::supabase::SupabaseRpcClient;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[cfg(test)]
mod tests;
