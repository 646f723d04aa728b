//! Private Browsing Detection
//!
//! Heuristic, OR-combined: a small storage quota, a failing IndexedDB open,
//! or a failing durable-storage write/delete round trip each classify the
//! session as private. A quota estimate that throws is ignored.
//!
//! Misclassification only affects where identifiers are cached; the
//! identifier itself is computed the same way in both modes.

use std::sync::Arc;

use platform::storage::KeyValueStore;

use crate::domain::repository::DeviceProbe;
use crate::domain::value_objects::BrowsingMode;

/// Scratch key used for the durable-storage round trip
pub const ROUND_TRIP_KEY: &str = "__device_fingerprint_probe__";

pub struct IncognitoDetector<P>
where
    P: DeviceProbe,
{
    probe: Arc<P>,
    durable: Arc<dyn KeyValueStore>,
    quota_threshold: u64,
}

impl<P> IncognitoDetector<P>
where
    P: DeviceProbe,
{
    pub fn new(probe: Arc<P>, durable: Arc<dyn KeyValueStore>, quota_threshold: u64) -> Self {
        Self {
            probe,
            durable,
            quota_threshold,
        }
    }

    pub async fn detect(&self) -> BrowsingMode {
        let private = self.quota_is_small().await
            || self.indexed_db_fails().await
            || self.durable_round_trip_fails();
        let mode = if private {
            BrowsingMode::Private
        } else {
            BrowsingMode::Normal
        };
        tracing::debug!(mode = mode.as_str(), "Browsing mode detected");
        mode
    }

    async fn quota_is_small(&self) -> bool {
        match self.probe.storage_quota().await {
            Ok(Some(quota)) => quota < self.quota_threshold,
            Ok(None) => false,
            Err(e) => {
                tracing::debug!(error = %e, "Storage estimate failed, ignoring");
                false
            }
        }
    }

    async fn indexed_db_fails(&self) -> bool {
        match self.probe.open_indexed_db().await {
            Ok(()) => false,
            Err(e) => {
                tracing::debug!(error = %e, "IndexedDB unavailable");
                true
            }
        }
    }

    fn durable_round_trip_fails(&self) -> bool {
        let round_trip = self
            .durable
            .set(ROUND_TRIP_KEY, "1")
            .and_then(|()| self.durable.remove(ROUND_TRIP_KEY));
        match round_trip {
            Ok(()) => false,
            Err(e) => {
                tracing::debug!(error = %e, "Durable storage round trip failed");
                true
            }
        }
    }
}
