//! Supabase RPC Repository Implementation
//!
//! Calls the trial-usage database functions through PostgREST
//! (`POST {url}/rest/v1/rpc/{function}`).

use kernel::id::UserId;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::application::config::SupabaseConfig;
use crate::domain::entities::TrialUsage;
use crate::domain::repository::TrialUsageRepository;
use crate::domain::value_objects::FingerprintId;
use crate::error::{FingerprintError, FingerprintResult};

pub const CHECK_USAGE_FN: &str = "check_device_fingerprint_usage";
pub const ASSOCIATE_FN: &str = "associate_device_fingerprint_to_user";

/// One row returned by `check_device_fingerprint_usage`
///
/// Missing columns fall back to [`TrialUsage::default`].
#[derive(Debug, Default, Deserialize)]
struct TrialUsageRow {
    can_analyze: Option<bool>,
    remaining_trials: Option<i32>,
    is_registered: Option<bool>,
}

impl From<TrialUsageRow> for TrialUsage {
    fn from(row: TrialUsageRow) -> Self {
        let defaults = TrialUsage::default();
        Self {
            can_analyze: row.can_analyze.unwrap_or(defaults.can_analyze),
            remaining_trials: row.remaining_trials.unwrap_or(defaults.remaining_trials),
            is_registered: row.is_registered.unwrap_or(defaults.is_registered),
        }
    }
}

#[derive(Clone)]
pub struct SupabaseRpcClient {
    http: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseRpcClient {
    pub fn new(config: SupabaseConfig) -> FingerprintResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    async fn call(&self, function: &'static str, params: Value) -> FingerprintResult<Value> {
        let response = self
            .http
            .post(self.config.rpc_url(function))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.config.bearer_token())
            .json(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FingerprintError::Rpc {
                function,
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl TrialUsageRepository for SupabaseRpcClient {
    async fn check_usage(&self, fingerprint: &FingerprintId) -> FingerprintResult<TrialUsage> {
        let value = self
            .call(
                CHECK_USAGE_FN,
                json!({ "fingerprint_hash_param": fingerprint.as_str() }),
            )
            .await?;

        // set-returning functions answer with an array of rows
        let row = match value {
            Value::Array(rows) => rows.into_iter().next(),
            Value::Null => None,
            other => Some(other),
        };
        let usage = match row {
            Some(row) => serde_json::from_value::<TrialUsageRow>(row)?.into(),
            None => TrialUsage::default(),
        };
        Ok(usage)
    }

    async fn associate_to_user(
        &self,
        fingerprint: &FingerprintId,
        user_id: &UserId,
    ) -> FingerprintResult<bool> {
        let value = self
            .call(
                ASSOCIATE_FN,
                json!({
                    "fingerprint_hash_param": fingerprint.as_str(),
                    "user_uuid": user_id.to_string(),
                }),
            )
            .await?;
        Ok(value == Value::Bool(true))
    }
}
