//! Domain Value Objects
//!
//! Immutable value types for the device fingerprint domain.

use std::fmt;
use std::str::FromStr;

use platform::crypto::is_hex_of_len;
use serde::{Deserialize, Serialize};

use crate::error::{FingerprintError, FingerprintResult};

/// Fallback for a signal whose API is missing or failed
pub const UNKNOWN: &str = "unknown";
/// Fallback for numeric signals
pub const ZERO: &str = "0";
/// GPU signal when no WebGL context can be created
pub const NO_WEBGL: &str = "no-webgl";
/// GPU signal when probing the WebGL context failed
pub const GPU_ERROR: &str = "gpu-error";

/// Length of a fingerprint identifier in hex characters
pub const FINGERPRINT_HEX_LEN: usize = 64;

/// Ordered signal set
///
/// Field order is the hash order. Reordering fields, adding or removing a
/// signal, or changing how one is derived changes every identifier and
/// requires a new [`AlgorithmVersion`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSet {
    pub gpu: String,
    pub cores: String,
    pub memory: String,
    pub platform: String,
    pub user_agent: String,
    pub vendor: String,
    pub timezone: String,
    pub touch: String,
}

impl SignalSet {
    pub const LEN: usize = 8;

    /// Signals in hash order
    pub fn ordered(&self) -> [&str; Self::LEN] {
        [
            &self.gpu,
            &self.cores,
            &self.memory,
            &self.platform,
            &self.user_agent,
            &self.vendor,
            &self.timezone,
            &self.touch,
        ]
    }
}

/// Raw WebGL parameters read from a hidden canvas
///
/// `unmasked_*` come from the `WEBGL_debug_renderer_info` extension and are
/// `None` when the extension is unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphicsInfo {
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub renderer: Option<String>,
    #[serde(default)]
    pub unmasked_vendor: Option<String>,
    #[serde(default)]
    pub unmasked_renderer: Option<String>,
}

/// Per-deployment salt
///
/// Ships with the client, so it namespaces identifiers per deployment and
/// is not a secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Salt(String);

impl Salt {
    pub const DEFAULT: &'static str = "default-salt";

    pub fn new(salt: impl Into<String>) -> Self {
        Self(salt.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Salt {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

/// Version tag of the collection + hashing algorithm
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlgorithmVersion(String);

impl AlgorithmVersion {
    /// Tag of the algorithm implemented by this crate
    pub const CURRENT: &'static str = "v2.2";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, stored: &str) -> bool {
        self.0 == stored
    }
}

impl Default for AlgorithmVersion {
    fn default() -> Self {
        Self::new(Self::CURRENT)
    }
}

impl fmt::Display for AlgorithmVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether `candidate` has the shape of a fingerprint identifier
///
/// 64 hex characters; case is not significant.
pub fn validate_fingerprint(candidate: &str) -> bool {
    is_hex_of_len(candidate, FINGERPRINT_HEX_LEN)
}

/// Opaque device identifier (64 lowercase hex characters)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FingerprintId(String);

impl FingerprintId {
    /// Validate and normalize to lowercase
    pub fn parse(candidate: &str) -> FingerprintResult<Self> {
        if !validate_fingerprint(candidate) {
            return Err(FingerprintError::InvalidFingerprint(candidate.to_string()));
        }
        Ok(Self(candidate.to_ascii_lowercase()))
    }

    /// Wrap a freshly computed SHA-256 hex digest
    pub(crate) fn from_digest_hex(digest: String) -> Self {
        debug_assert!(validate_fingerprint(&digest));
        Self(digest)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl FromStr for FingerprintId {
    type Err = FingerprintError;

    fn from_str(s: &str) -> FingerprintResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FingerprintId {
    type Error = FingerprintError;

    fn try_from(value: String) -> FingerprintResult<Self> {
        Self::parse(&value)
    }
}

impl From<FingerprintId> for String {
    fn from(id: FingerprintId) -> Self {
        id.0
    }
}

impl AsRef<str> for FingerprintId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FingerprintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classification of the current browsing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowsingMode {
    Normal,
    Private,
}

impl BrowsingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowsingMode::Normal => "normal",
            BrowsingMode::Private => "private",
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, BrowsingMode::Private)
    }
}

/// Cached identifier with its absolute expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: FingerprintId,
    pub expires_at_ms: i64,
}

impl CacheEntry {
    pub fn new(fingerprint: FingerprintId, expires_at_ms: i64) -> Self {
        Self {
            fingerprint,
            expires_at_ms,
        }
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at_ms
    }
}
