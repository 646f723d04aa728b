//! Host Probe
//!
//! Reads what a native process can see about the machine it runs on. There
//! is no WebGL or vendor string outside a browser; those report as absent
//! and degrade to their fallbacks.

use std::path::Path;

use crate::domain::repository::DeviceProbe;
use crate::domain::value_objects::GraphicsInfo;
use crate::error::ProbeError;

/// `navigator.deviceMemory` never reports more than this (GiB)
const MAX_REPORTED_MEMORY_GIB: f64 = 8.0;
const MIN_REPORTED_MEMORY_GIB: f64 = 0.25;

#[derive(Debug, Clone, Default)]
pub struct HostProbe {
    user_agent: Option<String>,
}

impl HostProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

impl DeviceProbe for HostProbe {
    async fn graphics(&self) -> Result<Option<GraphicsInfo>, ProbeError> {
        Ok(None)
    }

    fn hardware_concurrency(&self) -> Result<Option<u32>, ProbeError> {
        std::thread::available_parallelism()
            .map(|n| Some(n.get() as u32))
            .map_err(|e| ProbeError::new("available_parallelism", e.to_string()))
    }

    fn device_memory(&self) -> Result<Option<f64>, ProbeError> {
        let meminfo = match std::fs::read_to_string("/proc/meminfo") {
            Ok(meminfo) => meminfo,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ProbeError::new("/proc/meminfo", e.to_string())),
        };
        Ok(parse_mem_total_kib(&meminfo).map(bucket_memory))
    }

    fn platform(&self) -> Result<Option<String>, ProbeError> {
        Ok(Some(platform_name(std::env::consts::OS, std::env::consts::ARCH)))
    }

    fn user_agent(&self) -> Result<Option<String>, ProbeError> {
        Ok(self.user_agent.clone())
    }

    fn vendor(&self) -> Result<Option<String>, ProbeError> {
        Ok(None)
    }

    fn timezone(&self) -> Result<Option<String>, ProbeError> {
        if let Ok(tz) = std::env::var("TZ") {
            let tz = tz.trim_start_matches(':').trim();
            if !tz.is_empty() {
                return Ok(Some(tz.to_string()));
            }
        }
        if let Ok(tz) = std::fs::read_to_string("/etc/timezone") {
            let tz = tz.trim();
            if !tz.is_empty() {
                return Ok(Some(tz.to_string()));
            }
        }
        Ok(std::fs::read_link("/etc/localtime")
            .ok()
            .and_then(|target| zone_from_localtime(&target)))
    }

    fn max_touch_points(&self) -> Result<Option<u32>, ProbeError> {
        Ok(Some(0))
    }

    async fn storage_quota(&self) -> Result<Option<u64>, ProbeError> {
        Ok(None)
    }

    async fn open_indexed_db(&self) -> Result<(), ProbeError> {
        Ok(())
    }
}

fn parse_mem_total_kib(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find_map(|line| line.strip_prefix("MemTotal:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kib| kib.parse().ok())
}

/// Round down to a power of two GiB, clamped like `navigator.deviceMemory`
fn bucket_memory(total_kib: u64) -> f64 {
    let gib = total_kib as f64 / (1024.0 * 1024.0);
    if gib <= MIN_REPORTED_MEMORY_GIB {
        return MIN_REPORTED_MEMORY_GIB;
    }
    2f64.powi(gib.log2().floor() as i32)
        .clamp(MIN_REPORTED_MEMORY_GIB, MAX_REPORTED_MEMORY_GIB)
}

fn platform_name(os: &str, arch: &str) -> String {
    match os {
        "macos" => "MacIntel".to_string(),
        "windows" => "Win32".to_string(),
        "linux" => format!("Linux {arch}"),
        other => other.to_string(),
    }
}

fn zone_from_localtime(target: &Path) -> Option<String> {
    let target = target.to_str()?;
    let (_, zone) = target.split_once("zoneinfo/")?;
    (!zone.is_empty()).then(|| zone.to_string())
}
