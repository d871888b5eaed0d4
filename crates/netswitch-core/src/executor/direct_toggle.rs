//! Direct-toggle executor
//!
//! No probing: apply the DHCP profile and keep it if a lease arrives,
//! otherwise apply the static profile. Never reports `both_failed`.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use super::split;
use crate::error::{Error, Result};
use crate::profile::{NetworkProfile, ProfileId};
use crate::traits::{ConfigApplier, Decision, SnapshotSource, SwitchExecutor, apply_profile};

const NAME: &str = "direct-toggle";

/// Fallback switch executor
pub struct DirectToggleExecutor {
    applier: Arc<dyn ConfigApplier>,
    snapshots: Arc<dyn SnapshotSource>,
    lease_timeout: Duration,
    lease_poll: Duration,
}

impl DirectToggleExecutor {
    pub fn new(applier: Arc<dyn ConfigApplier>, snapshots: Arc<dyn SnapshotSource>) -> Self {
        Self {
            applier,
            snapshots,
            lease_timeout: Duration::from_secs(6),
            lease_poll: Duration::from_secs(1),
        }
    }

    /// Override how long to wait for a DHCP lease
    pub fn with_lease_timeout(mut self, timeout: Duration) -> Self {
        self.lease_timeout = timeout;
        self
    }

    async fn apply(&self, adapter: &str, profile: &NetworkProfile) -> Result<()> {
        apply_profile(self.applier.as_ref(), adapter, profile)
            .await
            .map_err(|e| Error::executor(NAME, format!("failed to apply {}: {}", profile.id, e)))
    }

    async fn wait_for_lease(&self, adapter: &str) -> bool {
        let deadline = Instant::now() + self.lease_timeout;
        loop {
            match self.snapshots.snapshot(adapter).await {
                Ok(Some(snapshot)) if snapshot.has_valid_lease() => return true,
                Ok(_) => {}
                Err(e) => debug!("Lease check on {} failed: {}", adapter, e),
            }
            if Instant::now() + self.lease_poll > deadline {
                return false;
            }
            tokio::time::sleep(self.lease_poll).await;
        }
    }
}

#[async_trait]
impl SwitchExecutor for DirectToggleExecutor {
    async fn decide(
        &self,
        adapter_name: &str,
        current_active: ProfileId,
        profile_a: &NetworkProfile,
        profile_b: &NetworkProfile,
    ) -> Result<Decision> {
        let (current, _) = split(current_active, profile_a, profile_b);

        if profile_a.mode == profile_b.mode {
            debug!("Both profiles are {:?}, re-applying {}", profile_a.mode, current_active);
            self.apply(adapter_name, current).await?;
            return Ok(Decision::stay(current_active, None));
        }

        let (dhcp, fixed) = if profile_a.is_dhcp() {
            (profile_a, profile_b)
        } else {
            (profile_b, profile_a)
        };

        self.apply(adapter_name, dhcp).await?;
        let chosen = if self.wait_for_lease(adapter_name).await {
            info!("{} obtained a DHCP lease, keeping {}", adapter_name, dhcp.id);
            dhcp.id
        } else {
            info!(
                "No DHCP lease on {} after {:?}, applying {}",
                adapter_name, self.lease_timeout, fixed.id
            );
            self.apply(adapter_name, fixed).await?;
            fixed.id
        };

        if chosen == current_active {
            Ok(Decision::stay(chosen, None))
        } else {
            Ok(Decision::switched(chosen, None))
        }
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
