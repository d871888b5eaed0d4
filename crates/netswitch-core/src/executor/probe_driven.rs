//! Probe-driven executor
//!
//! Applies the current profile and tests it (gateway first, then the
//! profile's ping target). If that side is dead the other profile is applied
//! and tested. If both are dead the current profile is re-applied and
//! `both_failed` is returned.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::split;
use crate::error::{Error, Result};
use crate::profile::{NetworkProfile, ProfileId, ProfileMode};
use crate::traits::{
    AdapterSnapshot, ConfigApplier, Decision, ReachabilityProbe, SnapshotSource, SwitchExecutor,
    apply_profile, probe_with_retries,
};

const NAME: &str = "probe-driven";

/// Readiness and probing limits of [`ProbeDrivenExecutor`]
#[derive(Debug, Clone)]
pub struct ProbeDrivenTiming {
    /// How long to wait for a DHCP lease with a gateway
    pub dhcp_ready_timeout: Duration,
    pub dhcp_ready_poll: Duration,
    /// How long to wait for a static address to show up
    pub static_ready_timeout: Duration,
    pub static_ready_poll: Duration,
    pub probe_attempts: u32,
    pub probe_timeout: Duration,
    pub probe_retry_delay: Duration,
}

impl Default for ProbeDrivenTiming {
    fn default() -> Self {
        Self {
            dhcp_ready_timeout: Duration::from_secs(6),
            dhcp_ready_poll: Duration::from_secs(1),
            static_ready_timeout: Duration::from_millis(1600),
            static_ready_poll: Duration::from_millis(200),
            probe_attempts: 2,
            probe_timeout: Duration::from_secs(1),
            probe_retry_delay: Duration::from_millis(300),
        }
    }
}

/// Primary switch executor
pub struct ProbeDrivenExecutor {
    applier: Arc<dyn ConfigApplier>,
    probe: Arc<dyn ReachabilityProbe>,
    snapshots: Arc<dyn SnapshotSource>,
    timing: ProbeDrivenTiming,
}

impl ProbeDrivenExecutor {
    pub fn new(
        applier: Arc<dyn ConfigApplier>,
        probe: Arc<dyn ReachabilityProbe>,
        snapshots: Arc<dyn SnapshotSource>,
    ) -> Self {
        Self {
            applier,
            probe,
            snapshots,
            timing: ProbeDrivenTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: ProbeDrivenTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Apply `profile` and test it; returns the ping target on success
    async fn try_side(&self, adapter: &str, profile: &NetworkProfile) -> Result<Option<String>> {
        apply_profile(self.applier.as_ref(), adapter, profile)
            .await
            .map_err(|e| Error::executor(NAME, format!("failed to apply {}: {}", profile.id, e)))?;

        let ready = self.wait_ready(adapter, profile).await;

        let gateway = match profile.mode {
            ProfileMode::Static => profile.static_config.gateway.trim().to_string(),
            ProfileMode::Dhcp => ready
                .map(|s| s.gateway.trim().to_string())
                .unwrap_or_default(),
        };
        if gateway.is_empty() || gateway == "0.0.0.0" {
            debug!("{} has no usable gateway on {}", profile.id, adapter);
            return Ok(None);
        }

        if !self.reachable(&gateway).await {
            debug!("{} gateway {} unreachable", profile.id, gateway);
            return Ok(None);
        }
        if !self.reachable(&profile.ping_target).await {
            debug!("{} target {} unreachable", profile.id, profile.ping_target);
            return Ok(None);
        }

        Ok(Some(profile.ping_target.clone()))
    }

    /// Poll until the applied profile is live or the wait runs out
    ///
    /// Returns the last snapshot read, ready or not.
    async fn wait_ready(&self, adapter: &str, profile: &NetworkProfile) -> Option<AdapterSnapshot> {
        let (timeout, poll) = match profile.mode {
            ProfileMode::Dhcp => (self.timing.dhcp_ready_timeout, self.timing.dhcp_ready_poll),
            ProfileMode::Static => (
                self.timing.static_ready_timeout,
                self.timing.static_ready_poll,
            ),
        };
        let expected_ip = profile.static_config.ip.trim();
        let deadline = Instant::now() + timeout;
        let mut last = None;

        loop {
            match self.snapshots.snapshot(adapter).await {
                Ok(Some(snapshot)) => {
                    let ready = match profile.mode {
                        ProfileMode::Dhcp => snapshot.has_valid_lease() && snapshot.has_gateway(),
                        ProfileMode::Static => {
                            expected_ip.is_empty() || snapshot.ip_address.trim() == expected_ip
                        }
                    };
                    last = Some(snapshot);
                    if ready {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => debug!("Readiness check on {} failed: {}", adapter, e),
            }

            if Instant::now() + poll > deadline {
                debug!("{} not ready on {} after {:?}", profile.id, adapter, timeout);
                break;
            }
            tokio::time::sleep(poll).await;
        }

        last
    }

    async fn reachable(&self, host: &str) -> bool {
        probe_with_retries(
            self.probe.as_ref(),
            host,
            self.timing.probe_timeout,
            self.timing.probe_attempts,
            self.timing.probe_retry_delay,
        )
        .await
    }
}

#[async_trait]
impl SwitchExecutor for ProbeDrivenExecutor {
    async fn decide(
        &self,
        adapter_name: &str,
        current_active: ProfileId,
        profile_a: &NetworkProfile,
        profile_b: &NetworkProfile,
    ) -> Result<Decision> {
        match self.snapshots.snapshot(adapter_name).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(Error::executor(
                    NAME,
                    format!("adapter {} not found", adapter_name),
                ));
            }
            Err(e) => return Err(Error::executor(NAME, e.to_string())),
        }

        let (current, other) = split(current_active, profile_a, profile_b);

        if let Some(target) = self.try_side(adapter_name, current).await? {
            info!("{} reachable via {}, staying", current_active, target);
            return Ok(Decision::stay(current_active, Some(target)));
        }

        let other_id = current_active.other();
        info!("{} unreachable, trying {}", current_active, other_id);
        if let Some(target) = self.try_side(adapter_name, other).await? {
            info!("{} reachable via {}, switching", other_id, target);
            return Ok(Decision::switched(other_id, Some(target)));
        }

        warn!(
            "Both {} and {} unreachable, restoring {}",
            current_active, other_id, current_active
        );
        if let Err(e) = apply_profile(self.applier.as_ref(), adapter_name, current).await {
            warn!("Failed to restore {}: {}", current_active, e);
        }
        Ok(Decision::both_failed(current_active))
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn is_available(&self) -> bool {
        self.probe.is_available()
    }
}
