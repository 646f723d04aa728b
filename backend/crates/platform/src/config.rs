//! Environment Configuration Helpers
//!
//! Small typed accessors over environment variables. Lookups go through
//! [`EnvSource`] so configuration structs can be built from a map in tests.

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Where variables are read from
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Trimmed value, `None` when unset or blank
pub fn lookup(env: &impl EnvSource, key: &str) -> Option<String> {
    env.var(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn required(env: &impl EnvSource, key: &str) -> Result<String, ConfigError> {
    lookup(env, key).ok_or_else(|| ConfigError::Missing(key.to_string()))
}

/// Parse a variable when present
pub fn parsed<T>(env: &impl EnvSource, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    lookup(env, key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}
