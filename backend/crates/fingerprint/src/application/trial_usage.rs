//! Trial Usage Use Cases
//!
//! Anonymous trial accounting is owned by the backend; these use cases only
//! ask it. A failed lookup never blocks the user: it answers with the
//! permissive [`TrialUsage::default`].

use std::sync::Arc;

use kernel::id::UserId;

use crate::application::generate::DeviceFingerprinter;
use crate::domain::entities::TrialUsage;
use crate::domain::repository::{DeviceProbe, TrialUsageRepository};
use crate::domain::value_objects::FingerprintId;

pub struct TrialUsageService<R, P>
where
    R: TrialUsageRepository,
    P: DeviceProbe,
{
    repo: Arc<R>,
    fingerprinter: Arc<DeviceFingerprinter<P>>,
}

impl<R, P> TrialUsageService<R, P>
where
    R: TrialUsageRepository,
    P: DeviceProbe,
{
    pub fn new(repo: Arc<R>, fingerprinter: Arc<DeviceFingerprinter<P>>) -> Self {
        Self {
            repo,
            fingerprinter,
        }
    }

    /// Remaining anonymous trials for `fingerprint` (this device when `None`)
    pub async fn check_trial_usage(&self, fingerprint: Option<&FingerprintId>) -> TrialUsage {
        let fingerprint = self.resolve(fingerprint).await;
        match self.repo.check_usage(&fingerprint).await {
            Ok(usage) => {
                tracing::debug!(
                    can_analyze = usage.can_analyze,
                    remaining = usage.remaining_trials,
                    registered = usage.is_registered,
                    "Trial usage checked"
                );
                usage
            }
            Err(e) => {
                e.log();
                TrialUsage::default()
            }
        }
    }

    /// Move this device's anonymous allowance onto `user_id`
    ///
    /// Called once after sign-in or registration. Returns `false` on any
    /// failure.
    pub async fn associate_with_user(
        &self,
        user_id: &UserId,
        fingerprint: Option<&FingerprintId>,
    ) -> bool {
        let fingerprint = self.resolve(fingerprint).await;
        match self.repo.associate_to_user(&fingerprint, user_id).await {
            Ok(true) => {
                tracing::info!(user_id = %user_id, "Device fingerprint associated to user");
                true
            }
            Ok(false) => {
                tracing::warn!(user_id = %user_id, "Backend declined fingerprint association");
                false
            }
            Err(e) => {
                e.log();
                false
            }
        }
    }

    async fn resolve(&self, fingerprint: Option<&FingerprintId>) -> FingerprintId {
        match fingerprint {
            Some(fingerprint) => fingerprint.clone(),
            None => self.fingerprinter.generate().await,
        }
    }
}
