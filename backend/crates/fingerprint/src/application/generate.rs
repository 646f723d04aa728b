//! Generate Fingerprint Use Case
//!
//! Three-tier lookup, after a once-per-process algorithm version check:
//! 1. in-memory memo
//! 2. persistent cache for the detected browsing mode
//! 3. fresh collection + hashing
//!
//! Concurrent cold callers queue on a single gate, so only the first one
//! collects and hashes; the rest pick up its memoized result.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use platform::clock::Clock;
use platform::storage::KeyValueStore;

use crate::application::cache::{FingerprintCache, VersionCheck};
use crate::application::collector::SignalCollector;
use crate::application::config::FingerprintConfig;
use crate::application::incognito::IncognitoDetector;
use crate::domain::entities::DeviceInfo;
use crate::domain::repository::DeviceProbe;
use crate::domain::services::compute_fingerprint;
use crate::domain::value_objects::{FingerprintId, SignalSet, UNKNOWN, validate_fingerprint};

/// Characters of the raw user agent kept in [`DeviceInfo`]
const DEVICE_INFO_UA_CHARS: usize = 100;

#[derive(Debug, Default)]
struct MemoState {
    fingerprint: Option<FingerprintId>,
    version_checked: bool,
    /// Bumped by every clear; an in-flight computation started under an
    /// older generation must not repopulate the caches
    generation: u64,
}

/// Device fingerprint generator
pub struct DeviceFingerprinter<P>
where
    P: DeviceProbe,
{
    probe: Arc<P>,
    collector: SignalCollector<P>,
    detector: IncognitoDetector<P>,
    cache: FingerprintCache,
    config: Arc<FingerprintConfig>,
    state: Mutex<MemoState>,
    cold_start: tokio::sync::Mutex<()>,
}

impl<P> DeviceFingerprinter<P>
where
    P: DeviceProbe,
{
    pub fn new(
        probe: Arc<P>,
        durable: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        config: Arc<FingerprintConfig>,
    ) -> Self {
        Self {
            collector: SignalCollector::new(probe.clone()),
            detector: IncognitoDetector::new(
                probe.clone(),
                durable.clone(),
                config.incognito_quota_threshold,
            ),
            cache: FingerprintCache::new(durable, session, &config),
            probe,
            config,
            state: Mutex::new(MemoState::default()),
            cold_start: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.cache = self.cache.with_clock(clock);
        self
    }

    pub fn config(&self) -> &FingerprintConfig {
        &self.config
    }

    /// The device's identifier; never fails
    pub async fn generate(&self) -> FingerprintId {
        if let Some(hit) = self.memoized() {
            return hit;
        }

        let _cold = self.cold_start.lock().await;

        // a caller ahead of us in the queue may have finished the work
        if let Some(hit) = self.memoized() {
            return hit;
        }
        let generation = self.ensure_version();

        let mode = self.detector.detect().await;
        if let Some(cached) = self.cache.load(mode) {
            tracing::debug!(mode = mode.as_str(), "Fingerprint served from cache");
            self.memoize(generation, &cached);
            return cached;
        }

        let signals = self.collector.collect().await;
        let fingerprint = compute_fingerprint(&signals, &self.config.salt);

        if self.memoize(generation, &fingerprint) {
            self.cache.store(mode, &fingerprint);
            tracing::info!(
                mode = mode.as_str(),
                version = %self.config.algorithm_version,
                "Generated device fingerprint"
            );
        } else {
            tracing::debug!("Cache cleared during generation, result not cached");
        }
        fingerprint
    }

    /// Wipe memo, persisted entries and in-flight bookkeeping
    ///
    /// The next [`generate`](Self::generate) re-checks the version tag and
    /// starts cold. Calling this repeatedly is harmless.
    pub fn clear_cache(&self) {
        {
            let mut state = self.lock_state();
            state.fingerprint = None;
            state.version_checked = false;
            state.generation = state.generation.wrapping_add(1);
        }
        self.cache.purge();
        tracing::info!("Device fingerprint cache cleared");
    }

    /// Whether `candidate` looks like an identifier produced here
    pub fn validate_fingerprint(candidate: &str) -> bool {
        validate_fingerprint(candidate)
    }

    /// Freshly collected signals, bypassing every cache
    pub async fn signals(&self) -> SignalSet {
        self.collector.collect().await
    }

    /// Diagnostic summary; never fails
    pub async fn device_info(&self) -> DeviceInfo {
        let signals = self.collector.collect().await;
        let browsing_mode = self.detector.detect().await;
        let user_agent = match self.probe.user_agent() {
            Ok(Some(ua)) => truncate_user_agent(&ua),
            _ => UNKNOWN.to_string(),
        };

        DeviceInfo {
            gpu: signals.gpu,
            cores: signals.cores,
            memory: signals.memory,
            platform: signals.platform,
            vendor: signals.vendor,
            timezone: signals.timezone,
            touch: signals.touch,
            user_agent,
            browsing_mode,
            algorithm_version: self.config.algorithm_version.to_string(),
            timestamp: Utc::now(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, MemoState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn memoized(&self) -> Option<FingerprintId> {
        let state = self.lock_state();
        state
            .fingerprint
            .clone()
            .filter(|_| state.version_checked)
    }

    /// Run the version check once per process; returns the current generation
    fn ensure_version(&self) -> u64 {
        let (checked, generation) = {
            let state = self.lock_state();
            (state.version_checked, state.generation)
        };
        if checked {
            return generation;
        }

        if let VersionCheck::Invalidated { previous } = self.cache.check_version() {
            tracing::debug!(previous = ?previous, "Stale fingerprint cache discarded");
        }

        let mut state = self.lock_state();
        if state.generation == generation {
            state.fingerprint = None;
            state.version_checked = true;
        }
        generation
    }

    /// Memoize unless a clear happened since `generation` was read
    fn memoize(&self, generation: u64, fingerprint: &FingerprintId) -> bool {
        let mut state = self.lock_state();
        if state.generation != generation {
            return false;
        }
        state.fingerprint = Some(fingerprint.clone());
        true
    }
}

fn truncate_user_agent(user_agent: &str) -> String {
    if user_agent.chars().count() <= DEVICE_INFO_UA_CHARS {
        return user_agent.to_string();
    }
    let mut truncated: String = user_agent.chars().take(DEVICE_INFO_UA_CHARS).collect();
    truncated.push_str("...");
    truncated
}
