//! Fingerprint Probe Entry Point
//!
//! Diagnostic executable: computes this device's fingerprint, prints it with
//! the device summary and, when a backend is configured, its trial usage.
//! Uses `anyhow` for startup errors, but library errors stay
//! `fingerprint::FingerprintError`.

use std::env;
use std::sync::Arc;

use anyhow::Context;
use fingerprint::domain::repository::DeviceProbe;
use fingerprint::{
    DeviceFingerprinter, FingerprintConfig, HostProbe, SnapshotProbe, SupabaseConfig,
    SupabaseRpcClient, TrialUsageService,
};
use kernel::error::app_error::ResultExt;
use kernel::error::kind::ErrorKind;
use kernel::id::UserId;
use platform::storage::{JsonFileStore, MemoryStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CACHE_PATH: &str = ".fingerprint-cache.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "fingerprint=info,platform=info,fingerprint_probe=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = FingerprintConfig::from_env().context("invalid fingerprint configuration")?;

    match env::var("DEVICE_SNAPSHOT_PATH") {
        Ok(snapshot_path) => {
            let json = std::fs::read_to_string(&snapshot_path)
                .map_app_err(ErrorKind::NotFound, "Cannot read device snapshot")?;
            let probe = SnapshotProbe::from_json(&json).context("malformed device snapshot")?;
            tracing::info!(path = %snapshot_path, "Using device snapshot");
            run(probe, config).await
        }
        Err(_) => {
            let probe = HostProbe::new()
                .with_user_agent(concat!("fingerprint-probe/", env!("CARGO_PKG_VERSION")));
            tracing::info!("Using host probe");
            run(probe, config).await
        }
    }
}

async fn run<P: DeviceProbe>(probe: P, config: FingerprintConfig) -> anyhow::Result<()> {
    let cache_path =
        env::var("FINGERPRINT_CACHE_PATH").unwrap_or_else(|_| DEFAULT_CACHE_PATH.to_string());
    let fingerprinter = Arc::new(DeviceFingerprinter::new(
        Arc::new(probe),
        Arc::new(JsonFileStore::new(&cache_path)),
        Arc::new(MemoryStore::new()),
        Arc::new(config),
    ));

    let fingerprint = fingerprinter.generate().await;
    println!("{fingerprint}");

    let info = fingerprinter.device_info().await;
    println!("{}", serde_json::to_string_pretty(&info)?);

    // Backend is optional
    let supabase = match SupabaseConfig::from_env() {
        Ok(supabase) => supabase,
        Err(e) => {
            tracing::info!(reason = %e, "Supabase not configured, skipping trial usage");
            return Ok(());
        }
    };

    let client = SupabaseRpcClient::new(supabase).context("cannot build RPC client")?;
    let trials = TrialUsageService::new(Arc::new(client), fingerprinter);

    let usage = trials.check_trial_usage(Some(&fingerprint)).await;
    println!("{}", serde_json::to_string_pretty(&usage)?);

    if let Ok(raw) = env::var("ASSOCIATE_USER_ID") {
        let user_id = UserId::parse_str(&raw).context("ASSOCIATE_USER_ID is not a UUID")?;
        let linked = trials.associate_with_user(&user_id, Some(&fingerprint)).await;
        tracing::info!(user_id = %user_id, linked, "Association attempted");
    }

    Ok(())
}
