// # Config Applier Trait
//
// Low-level OS operations used by the executor strategies.
//
// ## Implementations
//
// - `nmcli` (Linux): `netswitch-linux` crate

use async_trait::async_trait;

use crate::profile::{NetworkProfile, ProfileMode, StaticConfig};

/// Trait for applying addressing to an adapter
///
/// # Trust Level: Trusted (mutates OS network configuration)
///
/// - ✅ Perform exactly the requested change
/// - ❌ Probe, wait for readiness, or decide anything
#[async_trait]
pub trait ConfigApplier: Send + Sync {
    /// Switch the adapter to DHCP
    async fn apply_dhcp(&self, adapter_name: &str) -> Result<(), crate::Error>;

    /// Give the adapter a static address, gateway and DNS servers
    async fn apply_static(
        &self,
        adapter_name: &str,
        config: &StaticConfig,
    ) -> Result<(), crate::Error>;

    /// Override the adapter's DNS servers
    async fn set_dns(&self, adapter_name: &str, dns: &[String]) -> Result<(), crate::Error>;
}

/// Apply a whole profile through an applier
///
/// DHCP profiles push their DNS list after switching to DHCP when one is set.
pub async fn apply_profile(
    applier: &dyn ConfigApplier,
    adapter_name: &str,
    profile: &NetworkProfile,
) -> Result<(), crate::Error> {
    match profile.mode {
        ProfileMode::Dhcp => {
            applier.apply_dhcp(adapter_name).await?;
            if !profile.dhcp_dns.is_empty() {
                applier.set_dns(adapter_name, &profile.dhcp_dns).await?;
            }
            Ok(())
        }
        ProfileMode::Static => {
            applier
                .apply_static(adapter_name, &profile.static_config)
                .await
        }
    }
}
