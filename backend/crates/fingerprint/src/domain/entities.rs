//! Domain Entities

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::value_objects::BrowsingMode;

/// Anonymous trial allowance of a device, as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialUsage {
    pub can_analyze: bool,
    pub remaining_trials: i32,
    pub is_registered: bool,
}

impl TrialUsage {
    /// Trials granted to a device the backend knows nothing about
    pub const DEFAULT_REMAINING_TRIALS: i32 = 5;
}

impl Default for TrialUsage {
    /// Permissive answer used whenever the backend cannot be asked
    fn default() -> Self {
        Self {
            can_analyze: true,
            remaining_trials: Self::DEFAULT_REMAINING_TRIALS,
            is_registered: false,
        }
    }
}

/// Diagnostic summary of the current device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub gpu: String,
    pub cores: String,
    pub memory: String,
    pub platform: String,
    pub vendor: String,
    pub timezone: String,
    pub touch: String,
    /// Raw user agent, truncated
    pub user_agent: String,
    pub browsing_mode: BrowsingMode,
    pub algorithm_version: String,
    pub timestamp: DateTime<Utc>,
}
