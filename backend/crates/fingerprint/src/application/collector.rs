//! Signal Collection
//!
//! Reads the ordered signal set from a [`DeviceProbe`]. Every signal
//! degrades on its own: an absent API yields the signal's fallback, a
//! throwing API yields the fallback too (`gpu-error` for the GPU), and the
//! collection as a whole never fails.

use std::sync::Arc;

use crate::domain::repository::DeviceProbe;
use crate::domain::services::{gpu_signal, user_agent_signal};
use crate::domain::value_objects::{GPU_ERROR, NO_WEBGL, SignalSet, UNKNOWN, ZERO};
use crate::error::ProbeError;

pub struct SignalCollector<P>
where
    P: DeviceProbe,
{
    probe: Arc<P>,
}

impl<P> SignalCollector<P>
where
    P: DeviceProbe,
{
    pub fn new(probe: Arc<P>) -> Self {
        Self { probe }
    }

    pub async fn collect(&self) -> SignalSet {
        SignalSet {
            gpu: self.gpu().await,
            cores: self.cores(),
            memory: self.memory(),
            platform: self.platform(),
            user_agent: self.user_agent(),
            vendor: self.vendor(),
            timezone: self.timezone(),
            touch: self.touch(),
        }
    }

    pub async fn gpu(&self) -> String {
        match self.probe.graphics().await {
            Ok(Some(info)) => gpu_signal(&info),
            Ok(None) => {
                tracing::debug!("No WebGL context, using GPU fallback");
                NO_WEBGL.to_string()
            }
            Err(e) => {
                tracing::debug!(error = %e, "GPU probe failed");
                GPU_ERROR.to_string()
            }
        }
    }

    pub fn cores(&self) -> String {
        signal(self.probe.hardware_concurrency(), ZERO, |n| n.to_string())
    }

    pub fn memory(&self) -> String {
        signal(self.probe.device_memory(), ZERO, |gib| gib.to_string())
    }

    pub fn platform(&self) -> String {
        text_signal(self.probe.platform())
    }

    pub fn user_agent(&self) -> String {
        signal(self.probe.user_agent(), UNKNOWN, |ua| user_agent_signal(&ua))
    }

    pub fn vendor(&self) -> String {
        text_signal(self.probe.vendor())
    }

    pub fn timezone(&self) -> String {
        text_signal(self.probe.timezone())
    }

    pub fn touch(&self) -> String {
        signal(self.probe.max_touch_points(), ZERO, |n| n.to_string())
    }
}

fn signal<T>(
    probed: Result<Option<T>, ProbeError>,
    fallback: &str,
    render: impl FnOnce(T) -> String,
) -> String {
    match probed {
        Ok(Some(value)) => render(value),
        Ok(None) => fallback.to_string(),
        Err(e) => {
            tracing::debug!(api = e.api, error = %e, "Signal probe failed, using fallback");
            fallback.to_string()
        }
    }
}

/// Empty strings count as absent
fn text_signal(probed: Result<Option<String>, ProbeError>) -> String {
    signal(
        probed.map(|v| v.filter(|s| !s.trim().is_empty())),
        UNKNOWN,
        |s| s,
    )
}
