//! Unit tests for the fingerprint crate
//! End-to-end behaviour of the use cases over in-memory storage

#[cfg(test)]
mod support {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use platform::clock::ManualClock;
    use platform::storage::{KeyValueStore, MemoryStore};

    use crate::application::config::FingerprintConfig;
    use crate::application::generate::DeviceFingerprinter;
    use crate::domain::repository::DeviceProbe;
    use crate::domain::value_objects::GraphicsInfo;
    use crate::error::ProbeError;
    use crate::infra::snapshot::{DeviceSnapshot, Probed, SnapshotProbe};

    pub const CHROME_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    /// Scenario device with the default salt
    pub const MAC_ID: &str = "ba0ef74f1ca05d3b89171d2c1c09cf3bdb2c932bb97f2a8ded16efe48d5a41fc";
    /// Same device with 16 GiB reported
    pub const MAC_16G_ID: &str = "5c2a3b30861956f9aa8cb00a9e619864a2a169e3de473a5f6efb41b22a98031c";
    /// Every signal at its fallback
    pub const FALLBACK_ID: &str = "b4f65b7520e50459c0c1f499c4ffa400bb78ef51381fe5721ef965eaa9317168";
    /// Some other well-formed identifier
    pub const OTHER_ID: &str = "1111111111111111111111111111111111111111111111111111111111111111";

    pub const NOW_MS: i64 = 1_700_000_000_000;

    pub fn mac_snapshot() -> DeviceSnapshot {
        DeviceSnapshot {
            graphics: Some(
                GraphicsInfo {
                    vendor: Some("WebKit".into()),
                    renderer: Some("WebKit WebGL".into()),
                    unmasked_vendor: Some("Apple".into()),
                    unmasked_renderer: Some("Apple M1".into()),
                }
                .into(),
            ),
            hardware_concurrency: Some(Probed::Value(8)),
            device_memory: Some(Probed::Value(8.0)),
            platform: Some(String::from("MacIntel").into()),
            user_agent: Some(String::from(CHROME_MAC).into()),
            vendor: Some(String::from("Google Inc.").into()),
            timezone: Some(String::from("Europe/Berlin").into()),
            max_touch_points: Some(Probed::Value(0)),
            storage_quota: Some(Probed::Value(500_000_000)),
            indexed_db_error: None,
        }
    }

    pub fn failing_snapshot() -> DeviceSnapshot {
        fn failed<T>() -> Option<Probed<T>> {
            Some(Probed::Failed {
                error: "SecurityError".into(),
            })
        }
        DeviceSnapshot {
            graphics: failed(),
            hardware_concurrency: failed(),
            device_memory: failed(),
            platform: failed(),
            user_agent: failed(),
            vendor: failed(),
            timezone: failed(),
            max_touch_points: failed(),
            storage_quota: failed(),
            indexed_db_error: None,
        }
    }

    pub struct Harness<P: DeviceProbe> {
        pub durable: Arc<MemoryStore>,
        pub session: Arc<MemoryStore>,
        pub clock: Arc<ManualClock>,
        pub fingerprinter: Arc<DeviceFingerprinter<P>>,
    }

    pub fn harness_with<P: DeviceProbe>(
        probe: P,
        durable: MemoryStore,
        session: MemoryStore,
        config: FingerprintConfig,
    ) -> Harness<P> {
        let durable = Arc::new(durable);
        let session = Arc::new(session);
        let clock = Arc::new(ManualClock::new(NOW_MS));
        let fingerprinter = DeviceFingerprinter::new(
            Arc::new(probe),
            durable.clone(),
            session.clone(),
            Arc::new(config),
        )
        .with_clock(clock.clone());
        Harness {
            durable,
            session,
            clock,
            fingerprinter: Arc::new(fingerprinter),
        }
    }

    pub fn harness(snapshot: DeviceSnapshot) -> Harness<SnapshotProbe> {
        harness_with(
            SnapshotProbe::new(snapshot),
            MemoryStore::new(),
            MemoryStore::new(),
            FingerprintConfig::default(),
        )
    }

    /// A second process over the same storage media and clock
    pub fn reopen<P: DeviceProbe, Q: DeviceProbe>(
        h: &Harness<P>,
        probe: Q,
    ) -> DeviceFingerprinter<Q> {
        DeviceFingerprinter::new(
            Arc::new(probe),
            h.durable.clone(),
            h.session.clone(),
            Arc::new(FingerprintConfig::default()),
        )
        .with_clock(h.clock.clone())
    }

    pub fn seed_durable(store: &MemoryStore, id: &str, expires_at_ms: i64, version: &str) {
        store.set(crate::application::cache::CACHE_KEY, id).unwrap();
        store
            .set(
                crate::application::cache::EXPIRY_KEY,
                &expires_at_ms.to_string(),
            )
            .unwrap();
        store
            .set(crate::application::cache::VERSION_KEY, version)
            .unwrap();
    }

    /// Snapshot probe that counts (and slows down) GPU reads
    pub struct CountingProbe {
        pub inner: SnapshotProbe,
        pub gpu_reads: Arc<AtomicUsize>,
    }

    impl CountingProbe {
        pub fn new(snapshot: DeviceSnapshot) -> Self {
            Self {
                inner: SnapshotProbe::new(snapshot),
                gpu_reads: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl DeviceProbe for CountingProbe {
        async fn graphics(&self) -> Result<Option<GraphicsInfo>, ProbeError> {
            self.gpu_reads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.inner.graphics().await
        }

        fn hardware_concurrency(&self) -> Result<Option<u32>, ProbeError> {
            self.inner.hardware_concurrency()
        }

        fn device_memory(&self) -> Result<Option<f64>, ProbeError> {
            self.inner.device_memory()
        }

        fn platform(&self) -> Result<Option<String>, ProbeError> {
            self.inner.platform()
        }

        fn user_agent(&self) -> Result<Option<String>, ProbeError> {
            self.inner.user_agent()
        }

        fn vendor(&self) -> Result<Option<String>, ProbeError> {
            self.inner.vendor()
        }

        fn timezone(&self) -> Result<Option<String>, ProbeError> {
            self.inner.timezone()
        }

        fn max_touch_points(&self) -> Result<Option<u32>, ProbeError> {
            self.inner.max_touch_points()
        }

        async fn storage_quota(&self) -> Result<Option<u64>, ProbeError> {
            self.inner.storage_quota().await
        }

        async fn open_indexed_db(&self) -> Result<(), ProbeError> {
            self.inner.open_indexed_db().await
        }
    }
}

#[cfg(test)]
mod generate_tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use platform::storage::{JsonFileStore, KeyValueStore, MemoryStore};

    use super::support::*;
    use crate::application::cache::{CACHE_KEY, EXPIRY_KEY, STABLE_KEY, VERSION_KEY};
    use crate::application::config::FingerprintConfig;
    use crate::application::generate::DeviceFingerprinter;
    use crate::domain::value_objects::{Salt, validate_fingerprint};
    use crate::infra::snapshot::{DeviceSnapshot, Probed, SnapshotProbe};

    #[tokio::test]
    async fn test_scenario_device_identifier() {
        let h = harness(mac_snapshot());
        let id = h.fingerprinter.generate().await;
        assert_eq!(id.as_str(), MAC_ID);
    }

    #[tokio::test]
    async fn test_memory_change_changes_identifier() {
        let mut snapshot = mac_snapshot();
        snapshot.device_memory = Some(Probed::Value(16.0));
        let h = harness(snapshot);
        assert_eq!(h.fingerprinter.generate().await.as_str(), MAC_16G_ID);
    }

    #[tokio::test]
    async fn test_generate_is_deterministic_across_instances() {
        let first = harness(mac_snapshot()).fingerprinter.generate().await;
        let second = harness(mac_snapshot()).fingerprinter.generate().await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_salt_namespaces_identifiers() {
        let config = FingerprintConfig {
            salt: Salt::new("other-salt"),
            ..FingerprintConfig::default()
        };
        let h = harness_with(
            SnapshotProbe::new(mac_snapshot()),
            MemoryStore::new(),
            MemoryStore::new(),
            config,
        );
        let id = h.fingerprinter.generate().await;
        assert_eq!(
            id.as_str(),
            "b7019bc8a55c1a0a2366102258e4f3f26101830b8120d279f3b13c4ec5fc5388"
        );
    }

    #[tokio::test]
    async fn test_output_format() {
        let id = harness(mac_snapshot()).fingerprinter.generate().await;
        assert_eq!(id.as_str().len(), 64);
        assert!(
            id.as_str()
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
        assert!(validate_fingerprint(id.as_str()));
        assert_eq!(hex::decode(id.as_str()).unwrap().len(), 32);
    }

    #[tokio::test]
    async fn test_absent_apis_use_fallbacks() {
        let h = harness(DeviceSnapshot::default());
        let signals = h.fingerprinter.signals().await;
        assert_eq!(
            signals.ordered(),
            [
                "no-webgl", "0", "0", "unknown", "unknown", "unknown", "unknown", "0"
            ]
        );
        assert_eq!(h.fingerprinter.generate().await.as_str(), FALLBACK_ID);
    }

    #[tokio::test]
    async fn test_throwing_apis_use_fallbacks() {
        let h = harness(failing_snapshot());
        let signals = h.fingerprinter.signals().await;
        assert_eq!(
            signals.ordered(),
            [
                "gpu-error", "0", "0", "unknown", "unknown", "unknown", "unknown", "0"
            ]
        );
        assert!(validate_fingerprint(
            h.fingerprinter.generate().await.as_str()
        ));
    }

    #[tokio::test]
    async fn test_webgl_without_debug_extension_uses_masked_values() {
        let mut snapshot = mac_snapshot();
        snapshot.graphics = Some(
            crate::domain::value_objects::GraphicsInfo {
                vendor: Some("WebKit".into()),
                renderer: Some("WebKit WebGL".into()),
                unmasked_vendor: None,
                unmasked_renderer: None,
            }
            .into(),
        );
        let h = harness(snapshot);
        assert_eq!(h.fingerprinter.signals().await.gpu, "WebKit~WebKit WebGL");
    }

    #[tokio::test]
    async fn test_concurrent_cold_calls_compute_once() {
        let probe = CountingProbe::new(mac_snapshot());
        let reads = probe.gpu_reads.clone();
        let h = harness_with(
            probe,
            MemoryStore::new(),
            MemoryStore::new(),
            FingerprintConfig::default(),
        );

        let (a, b, c) = tokio::join!(
            h.fingerprinter.generate(),
            h.fingerprinter.generate(),
            h.fingerprinter.generate()
        );
        assert_eq!(a.as_str(), MAC_ID);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(reads.load(Ordering::SeqCst), 1);

        // warm calls never touch the probe again
        h.fingerprinter.generate().await;
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_normal_mode_persists_durable_entry() {
        let h = harness(mac_snapshot());
        h.fingerprinter.generate().await;

        assert_eq!(h.durable.get(CACHE_KEY).unwrap().as_deref(), Some(MAC_ID));
        let expiry: i64 = h.durable.get(EXPIRY_KEY).unwrap().unwrap().parse().unwrap();
        assert_eq!(expiry, NOW_MS + 24 * 60 * 60 * 1000);
        assert_eq!(h.durable.get(VERSION_KEY).unwrap().as_deref(), Some("v2.2"));
        assert_eq!(h.session.get(STABLE_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_fresh_cache_entry_is_served() {
        let durable = MemoryStore::new();
        seed_durable(&durable, OTHER_ID, NOW_MS + 60_000, "v2.2");
        let h = harness_with(
            SnapshotProbe::new(mac_snapshot()),
            durable,
            MemoryStore::new(),
            FingerprintConfig::default(),
        );
        assert_eq!(h.fingerprinter.generate().await.as_str(), OTHER_ID);
    }

    #[tokio::test]
    async fn test_expired_cache_entry_is_recomputed() {
        let durable = MemoryStore::new();
        seed_durable(&durable, OTHER_ID, NOW_MS - 1, "v2.2");
        let h = harness_with(
            SnapshotProbe::new(mac_snapshot()),
            durable,
            MemoryStore::new(),
            FingerprintConfig::default(),
        );
        assert_eq!(h.fingerprinter.generate().await.as_str(), MAC_ID);
        assert_eq!(h.durable.get(CACHE_KEY).unwrap().as_deref(), Some(MAC_ID));
    }

    #[tokio::test]
    async fn test_entry_expiring_exactly_now_is_still_valid() {
        let durable = MemoryStore::new();
        seed_durable(&durable, OTHER_ID, NOW_MS, "v2.2");
        let h = harness_with(
            SnapshotProbe::new(mac_snapshot()),
            durable,
            MemoryStore::new(),
            FingerprintConfig::default(),
        );
        assert_eq!(h.fingerprinter.generate().await.as_str(), OTHER_ID);
    }

    #[tokio::test]
    async fn test_version_change_invalidates_cache() {
        let durable = MemoryStore::new();
        seed_durable(&durable, OTHER_ID, NOW_MS + 60_000, "v2.1");
        let h = harness_with(
            SnapshotProbe::new(mac_snapshot()),
            durable,
            MemoryStore::new(),
            FingerprintConfig::default(),
        );

        assert_eq!(h.fingerprinter.generate().await.as_str(), MAC_ID);
        assert_eq!(h.durable.get(VERSION_KEY).unwrap().as_deref(), Some("v2.2"));
        assert_eq!(h.durable.get(CACHE_KEY).unwrap().as_deref(), Some(MAC_ID));
    }

    #[tokio::test]
    async fn test_missing_version_tag_invalidates_cache() {
        let durable = MemoryStore::new();
        durable.set(CACHE_KEY, OTHER_ID).unwrap();
        durable
            .set(EXPIRY_KEY, &(NOW_MS + 60_000).to_string())
            .unwrap();
        let h = harness_with(
            SnapshotProbe::new(mac_snapshot()),
            durable,
            MemoryStore::new(),
            FingerprintConfig::default(),
        );
        assert_eq!(h.fingerprinter.generate().await.as_str(), MAC_ID);
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let h = harness(mac_snapshot());
        h.fingerprinter.generate().await;
        h.durable.set(CACHE_KEY, OTHER_ID).unwrap();

        // a new process within the TTL is served from the durable entry
        let again = reopen(&h, SnapshotProbe::new(mac_snapshot()));
        assert_eq!(again.generate().await.as_str(), OTHER_ID);

        h.clock
            .advance(Duration::from_secs(24 * 60 * 60) + Duration::from_millis(1));
        let later = reopen(&h, SnapshotProbe::new(mac_snapshot()));
        assert_eq!(later.generate().await.as_str(), MAC_ID);
    }

    #[tokio::test]
    async fn test_file_store_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let first = DeviceFingerprinter::new(
            Arc::new(SnapshotProbe::new(mac_snapshot())),
            Arc::new(JsonFileStore::new(&path)),
            Arc::new(MemoryStore::new()),
            Arc::new(FingerprintConfig::default()),
        );
        assert_eq!(first.generate().await.as_str(), MAC_ID);

        // served from disk even though the device now looks different
        let second = DeviceFingerprinter::new(
            Arc::new(SnapshotProbe::new(DeviceSnapshot::default())),
            Arc::new(JsonFileStore::new(&path)),
            Arc::new(MemoryStore::new()),
            Arc::new(FingerprintConfig::default()),
        );
        assert_eq!(second.generate().await.as_str(), MAC_ID);

        second.clear_cache();
        assert_eq!(second.generate().await.as_str(), FALLBACK_ID);
    }

    #[tokio::test]
    async fn test_private_mode_uses_stable_entry() {
        let mut snapshot = mac_snapshot();
        snapshot.storage_quota = Some(Probed::Value(50_000_000));
        let h = harness(snapshot);

        assert_eq!(h.fingerprinter.generate().await.as_str(), MAC_ID);
        assert!(h.session.get(STABLE_KEY).unwrap().is_some());
        assert!(h.durable.get(STABLE_KEY).unwrap().is_some());
        assert_eq!(h.durable.get(CACHE_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_private_mode_ignores_normal_entry() {
        let mut snapshot = mac_snapshot();
        snapshot.indexed_db_error = Some("InvalidStateError".into());
        let durable = MemoryStore::new();
        seed_durable(&durable, OTHER_ID, NOW_MS + 60_000, "v2.2");
        let h = harness_with(
            SnapshotProbe::new(snapshot),
            durable,
            MemoryStore::new(),
            FingerprintConfig::default(),
        );
        assert_eq!(h.fingerprinter.generate().await.as_str(), MAC_ID);
    }

    #[tokio::test]
    async fn test_identifier_is_mode_independent() {
        let normal = harness(mac_snapshot()).fingerprinter.generate().await;

        let mut snapshot = mac_snapshot();
        snapshot.storage_quota = Some(Probed::Value(1_000));
        let private = harness(snapshot).fingerprinter.generate().await;
        assert_eq!(normal, private);
    }

    #[tokio::test]
    async fn test_disabled_storage_still_yields_identifier() {
        let h = harness_with(
            SnapshotProbe::new(mac_snapshot()),
            MemoryStore::disabled(),
            MemoryStore::disabled(),
            FingerprintConfig::default(),
        );
        assert_eq!(h.fingerprinter.generate().await.as_str(), MAC_ID);
        assert_eq!(h.fingerprinter.generate().await.as_str(), MAC_ID);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_recompute() {
        let durable = MemoryStore::new();
        seed_durable(&durable, OTHER_ID, NOW_MS + 60_000, "v2.2");
        let h = harness_with(
            SnapshotProbe::new(mac_snapshot()),
            durable,
            MemoryStore::new(),
            FingerprintConfig::default(),
        );
        assert_eq!(h.fingerprinter.generate().await.as_str(), OTHER_ID);

        h.fingerprinter.clear_cache();
        assert_eq!(h.durable.get(CACHE_KEY).unwrap(), None);
        assert_eq!(h.durable.get(EXPIRY_KEY).unwrap(), None);
        assert_eq!(h.fingerprinter.generate().await.as_str(), MAC_ID);
    }

    #[tokio::test]
    async fn test_clear_during_generation_discards_result() {
        let probe = CountingProbe::new(mac_snapshot());
        let reads = probe.gpu_reads.clone();
        let h = harness_with(
            probe,
            MemoryStore::new(),
            MemoryStore::new(),
            FingerprintConfig::default(),
        );

        // the clear lands while the GPU read is still sleeping
        let (id, ()) = tokio::join!(h.fingerprinter.generate(), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            h.fingerprinter.clear_cache();
        });
        assert_eq!(id.as_str(), MAC_ID);
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert_eq!(h.durable.get(CACHE_KEY).unwrap(), None);
        assert_eq!(h.durable.get(EXPIRY_KEY).unwrap(), None);

        // nothing was memoized either, so the next call collects again
        assert_eq!(h.fingerprinter.generate().await.as_str(), MAC_ID);
        assert_eq!(reads.load(Ordering::SeqCst), 2);
        assert_eq!(h.durable.get(CACHE_KEY).unwrap().as_deref(), Some(MAC_ID));
    }

    #[tokio::test]
    async fn test_huge_ttl_never_breaks_generation() {
        let h = harness_with(
            SnapshotProbe::new(mac_snapshot()),
            MemoryStore::new(),
            MemoryStore::new(),
            FingerprintConfig {
                cache_ttl: Duration::from_secs(9_223_372_036_854_775),
                ..FingerprintConfig::default()
            },
        );
        assert_eq!(h.fingerprinter.generate().await.as_str(), MAC_ID);

        let expiry: i64 = h.durable.get(EXPIRY_KEY).unwrap().unwrap().parse().unwrap();
        assert_eq!(expiry, i64::MAX);

        h.durable.set(CACHE_KEY, OTHER_ID).unwrap();
        let again = reopen(&h, SnapshotProbe::new(mac_snapshot()));
        assert_eq!(again.generate().await.as_str(), OTHER_ID);
    }

    #[tokio::test]
    async fn test_clear_cache_is_idempotent() {
        let h = harness(mac_snapshot());
        h.fingerprinter.clear_cache();
        h.fingerprinter.generate().await;
        h.fingerprinter.clear_cache();
        h.fingerprinter.clear_cache();

        assert_eq!(h.durable.get(CACHE_KEY).unwrap(), None);
        assert_eq!(h.session.get(STABLE_KEY).unwrap(), None);
        assert_eq!(h.fingerprinter.generate().await.as_str(), MAC_ID);
    }

    #[tokio::test]
    async fn test_device_info() {
        let h = harness(mac_snapshot());
        let info = h.fingerprinter.device_info().await;

        assert_eq!(info.gpu, "Apple~Apple M1");
        assert_eq!(info.cores, "8");
        assert_eq!(info.memory, "8");
        assert_eq!(info.platform, "MacIntel");
        assert_eq!(info.vendor, "Google Inc.");
        assert_eq!(info.timezone, "Europe/Berlin");
        assert_eq!(info.touch, "0");
        assert_eq!(info.algorithm_version, "v2.2");
        assert!(!info.browsing_mode.is_private());
        assert_eq!(info.user_agent.chars().count(), 103);
        assert!(info.user_agent.starts_with("Mozilla/5.0 (Macintosh"));
        assert!(info.user_agent.ends_with("..."));
    }

    #[tokio::test]
    async fn test_device_info_degrades() {
        let h = harness(failing_snapshot());
        let info = h.fingerprinter.device_info().await;
        assert_eq!(info.gpu, "gpu-error");
        assert_eq!(info.user_agent, "unknown");
        assert_eq!(info.algorithm_version, "v2.2");
    }
}

#[cfg(test)]
mod incognito_tests {
    use std::sync::Arc;

    use platform::storage::{KeyValueStore, MemoryStore};

    use super::support::*;
    use crate::application::incognito::{IncognitoDetector, ROUND_TRIP_KEY};
    use crate::domain::value_objects::BrowsingMode;
    use crate::infra::snapshot::{DeviceSnapshot, Probed, SnapshotProbe};

    const THRESHOLD: u64 = 120_000_000;

    async fn detect(snapshot: DeviceSnapshot, durable: MemoryStore) -> BrowsingMode {
        IncognitoDetector::new(
            Arc::new(SnapshotProbe::new(snapshot)),
            Arc::new(durable),
            THRESHOLD,
        )
        .detect()
        .await
    }

    #[tokio::test]
    async fn test_normal_session() {
        assert_eq!(
            detect(mac_snapshot(), MemoryStore::new()).await,
            BrowsingMode::Normal
        );
    }

    #[tokio::test]
    async fn test_small_quota_is_private() {
        let mut snapshot = mac_snapshot();
        snapshot.storage_quota = Some(Probed::Value(THRESHOLD - 1));
        assert_eq!(
            detect(snapshot, MemoryStore::new()).await,
            BrowsingMode::Private
        );

        let mut snapshot = mac_snapshot();
        snapshot.storage_quota = Some(Probed::Value(THRESHOLD));
        assert_eq!(
            detect(snapshot, MemoryStore::new()).await,
            BrowsingMode::Normal
        );
    }

    #[tokio::test]
    async fn test_throwing_quota_estimate_is_ignored() {
        let mut snapshot = mac_snapshot();
        snapshot.storage_quota = Some(Probed::Failed {
            error: "NotSupportedError".into(),
        });
        assert_eq!(
            detect(snapshot, MemoryStore::new()).await,
            BrowsingMode::Normal
        );
    }

    #[tokio::test]
    async fn test_indexed_db_failure_is_private() {
        let mut snapshot = mac_snapshot();
        snapshot.indexed_db_error = Some("InvalidStateError".into());
        assert_eq!(
            detect(snapshot, MemoryStore::new()).await,
            BrowsingMode::Private
        );
    }

    #[tokio::test]
    async fn test_durable_write_failure_is_private() {
        assert_eq!(
            detect(mac_snapshot(), MemoryStore::disabled()).await,
            BrowsingMode::Private
        );
        assert_eq!(
            detect(mac_snapshot(), MemoryStore::with_quota(4)).await,
            BrowsingMode::Private
        );
    }

    #[tokio::test]
    async fn test_round_trip_leaves_no_key_behind() {
        let durable = Arc::new(MemoryStore::new());
        let detector = IncognitoDetector::new(
            Arc::new(SnapshotProbe::new(mac_snapshot())),
            durable.clone(),
            THRESHOLD,
        );
        detector.detect().await;
        assert_eq!(durable.get(ROUND_TRIP_KEY).unwrap(), None);
    }
}

#[cfg(test)]
mod trial_usage_tests {
    use std::sync::{Arc, Mutex};

    use kernel::id::UserId;

    use super::support::*;
    use crate::application::trial_usage::TrialUsageService;
    use crate::domain::entities::TrialUsage;
    use crate::domain::repository::TrialUsageRepository;
    use crate::domain::value_objects::FingerprintId;
    use crate::error::{FingerprintError, FingerprintResult};
    use crate::infra::snapshot::SnapshotProbe;

    #[derive(Default)]
    struct FakeTrialRepo {
        usage: Option<TrialUsage>,
        associate: Option<bool>,
        seen: Mutex<Vec<String>>,
    }

    impl FakeTrialRepo {
        fn record(&self, fingerprint: &FingerprintId) {
            self.seen
                .lock()
                .unwrap()
                .push(fingerprint.as_str().to_string());
        }
    }

    impl TrialUsageRepository for FakeTrialRepo {
        async fn check_usage(&self, fingerprint: &FingerprintId) -> FingerprintResult<TrialUsage> {
            self.record(fingerprint);
            self.usage.ok_or(FingerprintError::Rpc {
                function: "check_device_fingerprint_usage",
                status: 500,
                body: "boom".into(),
            })
        }

        async fn associate_to_user(
            &self,
            fingerprint: &FingerprintId,
            _user_id: &UserId,
        ) -> FingerprintResult<bool> {
            self.record(fingerprint);
            self.associate.ok_or(FingerprintError::Rpc {
                function: "associate_device_fingerprint_to_user",
                status: 503,
                body: String::new(),
            })
        }
    }

    fn trial_service(
        repo: FakeTrialRepo,
    ) -> (Arc<FakeTrialRepo>, TrialUsageService<FakeTrialRepo, SnapshotProbe>) {
        let repo = Arc::new(repo);
        let h = harness(mac_snapshot());
        (repo.clone(), TrialUsageService::new(repo, h.fingerprinter))
    }

    #[tokio::test]
    async fn test_check_uses_this_device_by_default() {
        let usage = TrialUsage {
            can_analyze: false,
            remaining_trials: 0,
            is_registered: true,
        };
        let (repo, service) = trial_service(FakeTrialRepo {
            usage: Some(usage),
            ..Default::default()
        });

        assert_eq!(service.check_trial_usage(None).await, usage);
        assert_eq!(repo.seen.lock().unwrap().as_slice(), [MAC_ID]);
    }

    #[tokio::test]
    async fn test_check_with_explicit_fingerprint() {
        let (repo, service) = trial_service(FakeTrialRepo {
            usage: Some(TrialUsage::default()),
            ..Default::default()
        });
        let other = FingerprintId::parse(OTHER_ID).unwrap();

        service.check_trial_usage(Some(&other)).await;
        assert_eq!(repo.seen.lock().unwrap().as_slice(), [OTHER_ID]);
    }

    #[tokio::test]
    async fn test_check_failure_is_permissive() {
        let (_, service) = trial_service(FakeTrialRepo::default());
        let usage = service.check_trial_usage(None).await;
        assert!(usage.can_analyze);
        assert_eq!(usage.remaining_trials, 5);
        assert!(!usage.is_registered);
    }

    #[tokio::test]
    async fn test_associate_with_user() {
        let user = UserId::new();

        let (_, service) = trial_service(FakeTrialRepo {
            associate: Some(true),
            ..Default::default()
        });
        assert!(service.associate_with_user(&user, None).await);

        let (_, service) = trial_service(FakeTrialRepo {
            associate: Some(false),
            ..Default::default()
        });
        assert!(!service.associate_with_user(&user, None).await);

        let (_, service) = trial_service(FakeTrialRepo::default());
        assert!(!service.associate_with_user(&user, None).await);
    }
}

#[cfg(test)]
mod config_tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use crate::application::config::*;
    use crate::error::FingerprintError;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_fingerprint_config_defaults() {
        let config = FingerprintConfig::from_source(&env(&[])).unwrap();
        assert_eq!(config.salt.as_str(), "default-salt");
        assert_eq!(config.algorithm_version.as_str(), "v2.2");
        assert_eq!(config.cache_ttl, Duration::from_secs(86_400));
        assert_eq!(config.cache_ttl_ms(), 86_400_000);
        assert_eq!(config.incognito_quota_threshold, 120_000_000);
    }

    #[test]
    fn test_fingerprint_config_overrides() {
        let config = FingerprintConfig::from_source(&env(&[
            ("DEVICE_FINGERPRINT_SALT", "acme"),
            ("DEVICE_FINGERPRINT_VERSION", "v3.0"),
            ("DEVICE_FINGERPRINT_CACHE_TTL_SECS", "60"),
            ("DEVICE_FINGERPRINT_QUOTA_THRESHOLD", "1000"),
        ]))
        .unwrap();
        assert_eq!(config.salt.as_str(), "acme");
        assert_eq!(config.algorithm_version.as_str(), "v3.0");
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.incognito_quota_threshold, 1000);
    }

    #[test]
    fn test_fingerprint_config_rejects_bad_numbers() {
        let err = FingerprintConfig::from_source(&env(&[(
            "DEVICE_FINGERPRINT_CACHE_TTL_SECS",
            "a day",
        )]))
        .unwrap_err();
        assert!(matches!(err, FingerprintError::Config(_)));
    }

    #[test]
    fn test_fingerprint_config_rejects_ttl_beyond_i64_millis() {
        for secs in ["18446744073709551615", "9223372036854776"] {
            let err = FingerprintConfig::from_source(&env(&[(
                "DEVICE_FINGERPRINT_CACHE_TTL_SECS",
                secs,
            )]))
            .unwrap_err();
            assert!(matches!(err, FingerprintError::Config(_)), "{secs}");
        }

        // largest whole-second TTL that still fits
        let config = FingerprintConfig::from_source(&env(&[(
            "DEVICE_FINGERPRINT_CACHE_TTL_SECS",
            "9223372036854775",
        )]))
        .unwrap();
        assert_eq!(config.cache_ttl_ms(), 9_223_372_036_854_775_000);
    }

    #[test]
    fn test_cache_ttl_ms_saturates() {
        let config = FingerprintConfig {
            cache_ttl: Duration::MAX,
            ..FingerprintConfig::default()
        };
        assert_eq!(config.cache_ttl_ms(), i64::MAX);
    }

    #[test]
    fn test_supabase_config_requires_url_and_key() {
        let err = SupabaseConfig::from_source(&env(&[("SUPABASE_URL", "https://x.supabase.co")]))
            .unwrap_err();
        assert!(matches!(err, FingerprintError::Config(_)));

        let config = SupabaseConfig::from_source(&env(&[
            ("SUPABASE_URL", "https://x.supabase.co/"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("SUPABASE_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert_eq!(
            config.rpc_url("check_device_fingerprint_usage"),
            "https://x.supabase.co/rest/v1/rpc/check_device_fingerprint_usage"
        );
        assert_eq!(config.bearer_token(), "anon");
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.with_access_token("jwt").bearer_token(), "jwt");
    }
}
