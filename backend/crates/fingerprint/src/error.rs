//! Fingerprint Error Types
//!
//! This module provides fingerprint-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.
//!
//! None of these reach callers of `DeviceFingerprinter::generate`; they are
//! surfaced by the lower layers and degraded to fallbacks above them.

use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::config::ConfigError;
use platform::storage::StorageError;
use thiserror::Error;

/// Fingerprint-specific result type alias
pub type FingerprintResult<T> = Result<T, FingerprintError>;

/// Fingerprint-specific error variants
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// Value is not 64 hex characters
    #[error("Invalid device fingerprint: {0:?}")]
    InvalidFingerprint(String),

    /// Cache medium failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Environment configuration is missing or malformed
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend procedure answered with a non-success status
    #[error("RPC {function} failed with status {status}: {body}")]
    Rpc {
        function: &'static str,
        status: u16,
        body: String,
    },

    /// JSON payload (device snapshot or RPC response) could not be decoded
    #[error("Malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl FingerprintError {
    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            FingerprintError::InvalidFingerprint(_)
            | FingerprintError::Config(_)
            | FingerprintError::Json(_) => ErrorKind::InvalidInput,
            FingerprintError::Storage(_) => ErrorKind::StorageUnavailable,
            FingerprintError::Rpc { status, .. } => ErrorKind::from_http_status(*status),
            FingerprintError::Http(e) if e.is_timeout() => ErrorKind::Timeout,
            FingerprintError::Http(_) => ErrorKind::Upstream,
        }
    }

    /// Log the error with appropriate level
    ///
    /// Rejections the caller can fix are warnings; service failures are errors.
    pub fn log(&self) {
        match self {
            FingerprintError::Storage(e) => {
                tracing::debug!(error = %e, "Fingerprint storage error");
            }
            _ if self.kind().is_caller_error() => {
                tracing::warn!(kind = %self.kind(), error = %self, "Fingerprint request rejected");
            }
            FingerprintError::Rpc {
                function, status, ..
            } => {
                tracing::error!(function = %function, status = status, error = %self, "Backend RPC failed");
            }
            FingerprintError::Http(e) => {
                tracing::error!(error = %e, "Backend RPC transport error");
            }
            _ => {
                tracing::error!(kind = %self.kind(), error = %self, "Fingerprint error");
            }
        }
    }
}

impl From<FingerprintError> for AppError {
    fn from(err: FingerprintError) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        AppError::new(kind, message).with_source(err)
    }
}

/// A browser/device API threw while being probed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{api} failed: {message}")]
pub struct ProbeError {
    pub api: &'static str,
    pub message: String,
}

impl ProbeError {
    pub fn new(api: &'static str, message: impl Into<String>) -> Self {
        Self {
            api,
            message: message.into(),
        }
    }
}
