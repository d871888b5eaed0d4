// # Snapshot Source Trait
//
// Defines the interface for reading classified adapter snapshots.
//
// ## Implementations
//
// - sysfs/procfs (Linux): `netswitch-linux` crate
// - Test doubles: scripted snapshot lists
//
// ## Usage
//
// ```rust,ignore
// use netswitch_core::SnapshotSource;
//
// let source = /* SnapshotSource implementation */;
// if let Some(adapter) = source.snapshot("Ethernet").await? {
//     println!("{} up={} lease={}", adapter.name, adapter.is_enabled, adapter.has_valid_lease());
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Adapter classification, supplied by the snapshot provider and trusted as-is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterClass {
    Ethernet,
    Wifi,
    Virtual,
    Bluetooth,
    Other,
}

impl AdapterClass {
    /// Virtual and bluetooth adapters are never watched or switched
    pub fn is_ignored(self) -> bool {
        matches!(self, AdapterClass::Virtual | AdapterClass::Bluetooth)
    }
}

/// Point-in-time view of one network adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterSnapshot {
    pub name: String,
    /// Physical link is up
    pub is_enabled: bool,
    pub is_dhcp: bool,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub gateway: String,
    pub classification: AdapterClass,
}

impl AdapterSnapshot {
    /// Create a snapshot of an adapter with no address
    pub fn new(name: impl Into<String>, classification: AdapterClass) -> Self {
        Self {
            name: name.into(),
            is_enabled: false,
            is_dhcp: false,
            ip_address: String::new(),
            gateway: String::new(),
            classification,
        }
    }

    /// Set the link state
    pub fn with_link(mut self, up: bool) -> Self {
        self.is_enabled = up;
        self
    }

    /// Mark the adapter as DHCP-configured with the given lease
    pub fn with_dhcp_lease(mut self, ip: impl Into<String>, gateway: impl Into<String>) -> Self {
        self.is_dhcp = true;
        self.ip_address = ip.into();
        self.gateway = gateway.into();
        self
    }

    /// Mark the adapter as statically configured
    pub fn with_static_address(
        mut self,
        ip: impl Into<String>,
        gateway: impl Into<String>,
    ) -> Self {
        self.is_dhcp = false;
        self.ip_address = ip.into();
        self.gateway = gateway.into();
        self
    }

    /// Whether the adapter carries a usable address
    ///
    /// Empty, unparseable, unspecified and auto-configuration
    /// (169.254.0.0/16, fe80::/10) addresses are not usable.
    pub fn has_usable_address(&self) -> bool {
        match self.ip_address.trim().parse::<IpAddr>() {
            Ok(IpAddr::V4(v4)) => !v4.is_unspecified() && !v4.is_link_local(),
            Ok(IpAddr::V6(v6)) => !v6.is_unspecified() && (v6.segments()[0] & 0xffc0) != 0xfe80,
            Err(_) => false,
        }
    }

    /// DHCP-configured and holding a usable lease
    pub fn has_valid_lease(&self) -> bool {
        self.is_dhcp && self.has_usable_address()
    }

    /// A default gateway other than `0.0.0.0` is present
    pub fn has_gateway(&self) -> bool {
        let gw = self.gateway.trim();
        !gw.is_empty() && gw != "0.0.0.0"
    }
}

/// Trait for adapter snapshot providers
///
/// # Trust Level: Semi-Trusted
///
/// Snapshot providers perform platform I/O (sysfs, WMI, netlink) but make no
/// decisions: classification is reported, never recomputed by the engine or
/// the watcher.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Snapshot every adapter currently known to the system
    async fn snapshots(&self) -> Result<Vec<AdapterSnapshot>, crate::Error>;

    /// Snapshot a single adapter by name
    ///
    /// Returns `Ok(None)` when the adapter does not exist.
    async fn snapshot(&self, name: &str) -> Result<Option<AdapterSnapshot>, crate::Error> {
        Ok(self
            .snapshots()
            .await?
            .into_iter()
            .find(|a| a.name == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_lease() {
        let snap = AdapterSnapshot::new("Ethernet", AdapterClass::Ethernet)
            .with_link(true)
            .with_dhcp_lease("192.168.1.20", "192.168.1.1");
        assert!(snap.has_valid_lease());
        assert!(snap.has_gateway());
    }

    #[test]
    fn test_apipa_is_not_a_lease() {
        let snap = AdapterSnapshot::new("Ethernet", AdapterClass::Ethernet)
            .with_dhcp_lease("169.254.12.7", "");
        assert!(!snap.has_valid_lease());
        assert!(!snap.has_gateway());
    }

    #[test]
    fn test_static_address_is_not_a_lease() {
        let snap = AdapterSnapshot::new("Ethernet", AdapterClass::Ethernet)
            .with_static_address("172.16.1.55", "172.16.1.254");
        assert!(snap.has_usable_address());
        assert!(!snap.has_valid_lease());
    }

    #[test]
    fn test_empty_and_garbage_addresses() {
        let mut snap = AdapterSnapshot::new("Ethernet", AdapterClass::Ethernet).with_dhcp_lease("", "");
        assert!(!snap.has_valid_lease());
        snap.ip_address = "not-an-ip".to_string();
        assert!(!snap.has_valid_lease());
        snap.ip_address = "fe80::1".to_string();
        assert!(!snap.has_valid_lease());
        snap.ip_address = "2001:db8::20".to_string();
        assert!(snap.has_valid_lease());
    }

    #[test]
    fn test_ignored_classes() {
        assert!(AdapterClass::Virtual.is_ignored());
        assert!(AdapterClass::Bluetooth.is_ignored());
        assert!(!AdapterClass::Ethernet.is_ignored());
        assert!(!AdapterClass::Wifi.is_ignored());
    }
}
