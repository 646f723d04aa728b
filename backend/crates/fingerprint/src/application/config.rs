//! Application Configuration
//!
//! Configuration for fingerprint generation and the backend RPC client.

use std::time::Duration;

use platform::config::{self, ConfigError, EnvSource, ProcessEnv};

use crate::domain::value_objects::{AlgorithmVersion, Salt};
use crate::error::FingerprintResult;

/// Fingerprint generation configuration
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    /// Deployment salt appended to the signals before hashing
    pub salt: Salt,
    /// Tag persisted next to cached identifiers
    pub algorithm_version: AlgorithmVersion,
    /// Lifetime of a persisted cache entry
    pub cache_ttl: Duration,
    /// Storage quota (bytes) below which a session is classified private
    pub incognito_quota_threshold: u64,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            salt: Salt::default(),
            algorithm_version: AlgorithmVersion::default(),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            incognito_quota_threshold: 120_000_000,
        }
    }
}

impl FingerprintConfig {
    pub const SALT_VAR: &'static str = "DEVICE_FINGERPRINT_SALT";
    pub const VERSION_VAR: &'static str = "DEVICE_FINGERPRINT_VERSION";
    pub const CACHE_TTL_VAR: &'static str = "DEVICE_FINGERPRINT_CACHE_TTL_SECS";
    pub const QUOTA_THRESHOLD_VAR: &'static str = "DEVICE_FINGERPRINT_QUOTA_THRESHOLD";

    pub fn from_env() -> FingerprintResult<Self> {
        Self::from_source(&ProcessEnv)
    }

    /// Defaults overridden by whatever variables are set
    pub fn from_source(env: &impl EnvSource) -> FingerprintResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            salt: config::lookup(env, Self::SALT_VAR)
                .map(Salt::new)
                .unwrap_or(defaults.salt),
            algorithm_version: config::lookup(env, Self::VERSION_VAR)
                .map(AlgorithmVersion::new)
                .unwrap_or(defaults.algorithm_version),
            cache_ttl: Self::cache_ttl_from(env)?.unwrap_or(defaults.cache_ttl),
            incognito_quota_threshold: config::parsed(env, Self::QUOTA_THRESHOLD_VAR)?
                .unwrap_or(defaults.incognito_quota_threshold),
        })
    }

    /// Expiry timestamps are `i64` milliseconds, so the TTL has to fit
    fn cache_ttl_from(env: &impl EnvSource) -> Result<Option<Duration>, ConfigError> {
        let Some(secs) = config::parsed::<u64>(env, Self::CACHE_TTL_VAR)? else {
            return Ok(None);
        };
        match secs.checked_mul(1000) {
            Some(ms) if i64::try_from(ms).is_ok() => Ok(Some(Duration::from_secs(secs))),
            _ => Err(ConfigError::Invalid {
                key: Self::CACHE_TTL_VAR.to_string(),
                value: secs.to_string(),
                reason: "TTL in milliseconds exceeds i64::MAX".to_string(),
            }),
        }
    }

    /// TTL in milliseconds, saturating at `i64::MAX`
    pub fn cache_ttl_ms(&self) -> i64 {
        i64::try_from(self.cache_ttl.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Backend (Supabase PostgREST) connection settings
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Public anon key, sent as `apikey`
    pub anon_key: String,
    /// Signed-in user's access token; the anon key is used when absent
    pub access_token: Option<String>,
    pub request_timeout: Duration,
}

impl SupabaseConfig {
    pub const URL_VAR: &'static str = "SUPABASE_URL";
    pub const ANON_KEY_VAR: &'static str = "SUPABASE_ANON_KEY";
    pub const ACCESS_TOKEN_VAR: &'static str = "SUPABASE_ACCESS_TOKEN";
    pub const TIMEOUT_VAR: &'static str = "SUPABASE_TIMEOUT_SECS";

    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            access_token: None,
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn from_env() -> FingerprintResult<Self> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(env: &impl EnvSource) -> FingerprintResult<Self> {
        let mut cfg = Self::new(
            config::required(env, Self::URL_VAR)?,
            config::required(env, Self::ANON_KEY_VAR)?,
        );
        cfg.access_token = config::lookup(env, Self::ACCESS_TOKEN_VAR);
        if let Some(secs) = config::parsed::<u64>(env, Self::TIMEOUT_VAR)? {
            cfg.request_timeout = Duration::from_secs(secs);
        }
        Ok(cfg)
    }

    /// PostgREST endpoint of a database function
    pub fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.url.trim_end_matches('/'), function)
    }

    /// Token sent as `Authorization: Bearer`
    pub fn bearer_token(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.anon_key)
    }
}
