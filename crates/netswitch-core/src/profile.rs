//! Network profile data model
//!
//! The persisted shape is a single [`AutoSwitchConfig`] holding exactly two
//! [`NetworkProfile`]s. Every field has a default so that a profile is never
//! observed with a missing sub-field; see [`crate::normalize`] for how loose
//! or legacy JSON is brought into this shape.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use crate::error::{Error, Result};

/// Ping target used when a profile does not name one
pub const DEFAULT_PING_TARGET: &str = "baidu.com";

/// Indicator color of profile A when none is configured
pub const DEFAULT_COLOR_A: &str = "#00FF00";

/// Indicator color of profile B when none is configured
pub const DEFAULT_COLOR_B: &str = "#FFA500";

/// Indicator color shown when neither profile is reachable
pub const DEFAULT_ALARM_COLOR: &str = "#FF0000";

/// Which of the two profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProfileId {
    #[serde(alias = "network1")]
    ProfileA,
    #[serde(alias = "network2")]
    ProfileB,
}

impl ProfileId {
    /// The other profile
    pub fn other(self) -> Self {
        match self {
            ProfileId::ProfileA => ProfileId::ProfileB,
            ProfileId::ProfileB => ProfileId::ProfileA,
        }
    }

    /// Stable name used in logs and persisted JSON
    pub fn as_str(self) -> &'static str {
        match self {
            ProfileId::ProfileA => "profileA",
            ProfileId::ProfileB => "profileB",
        }
    }
}

impl std::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a profile configures the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileMode {
    Dhcp,
    Static,
}

/// Static addressing for a profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticConfig {
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub subnet: String,
    #[serde(default)]
    pub gateway: String,
    #[serde(default)]
    pub dns: Vec<String>,
}

impl StaticConfig {
    /// Whether ip, subnet and gateway are all filled in
    pub fn is_complete(&self) -> bool {
        !self.ip.trim().is_empty()
            && !self.subnet.trim().is_empty()
            && !self.gateway.trim().is_empty()
    }

    /// Prefix length of the subnet mask (`255.255.255.0` -> 24)
    pub fn prefix_len(&self) -> Result<u8> {
        subnet_to_prefix(&self.subnet)
    }
}

/// A named network configuration with its reachability target and color
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    pub id: ProfileId,
    pub mode: ProfileMode,
    #[serde(default)]
    pub dhcp_dns: Vec<String>,
    #[serde(default)]
    pub static_config: StaticConfig,
    pub ping_target: String,
    pub indicator_color: String,
}

impl NetworkProfile {
    /// Default profile for the given slot
    ///
    /// Profile A defaults to DHCP (the outward network), profile B to static.
    pub fn default_for(id: ProfileId) -> Self {
        let (mode, color) = match id {
            ProfileId::ProfileA => (ProfileMode::Dhcp, DEFAULT_COLOR_A),
            ProfileId::ProfileB => (ProfileMode::Static, DEFAULT_COLOR_B),
        };
        Self {
            id,
            mode,
            dhcp_dns: Vec::new(),
            static_config: StaticConfig::default(),
            ping_target: DEFAULT_PING_TARGET.to_string(),
            indicator_color: color.to_string(),
        }
    }

    /// Create a DHCP profile
    pub fn dhcp(id: ProfileId, ping_target: impl Into<String>) -> Self {
        Self {
            mode: ProfileMode::Dhcp,
            ping_target: ping_target.into(),
            ..Self::default_for(id)
        }
    }

    /// Create a static profile
    pub fn with_static(
        id: ProfileId,
        static_config: StaticConfig,
        ping_target: impl Into<String>,
    ) -> Self {
        Self {
            mode: ProfileMode::Static,
            static_config,
            ping_target: ping_target.into(),
            ..Self::default_for(id)
        }
    }

    /// Set the indicator color
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.indicator_color = color.into();
        self
    }

    /// Set the DNS servers pushed after a DHCP lease
    pub fn with_dhcp_dns(mut self, dns: Vec<String>) -> Self {
        self.dhcp_dns = dns;
        self
    }

    pub fn is_dhcp(&self) -> bool {
        self.mode == ProfileMode::Dhcp
    }

    /// Trim strings, drop blank DNS entries and canonicalise the color
    pub fn normalized(mut self) -> Self {
        self.dhcp_dns = clean_dns(self.dhcp_dns);
        self.static_config.ip = self.static_config.ip.trim().to_string();
        self.static_config.subnet = self.static_config.subnet.trim().to_string();
        self.static_config.gateway = self.static_config.gateway.trim().to_string();
        self.static_config.dns = clean_dns(self.static_config.dns);
        self.ping_target = self.ping_target.trim().to_string();
        if self.ping_target.is_empty() {
            self.ping_target = DEFAULT_PING_TARGET.to_string();
        }
        self.indicator_color = normalize_color(&self.indicator_color)
            .unwrap_or_else(|| Self::default_for(self.id).indicator_color);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.ping_target.trim().is_empty() {
            return Err(Error::config_invalid(format!(
                "{} needs a ping target",
                self.id
            )));
        }

        if self.mode == ProfileMode::Static {
            let s = &self.static_config;
            if !s.is_complete() {
                return Err(Error::config_invalid(format!(
                    "{} is static but ip, subnet and gateway are not all set",
                    self.id
                )));
            }
            for (label, value) in [("ip", &s.ip), ("gateway", &s.gateway)] {
                if value.trim().parse::<Ipv4Addr>().is_err() {
                    return Err(Error::config_invalid(format!(
                        "{} static {} '{}' is not an IPv4 address",
                        self.id, label, value
                    )));
                }
            }
            s.prefix_len().map_err(|e| {
                Error::config_invalid(format!("{} static subnet: {}", self.id, e))
            })?;
        }

        Ok(())
    }
}

/// The persisted two-profile auto-switch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoSwitchConfig {
    pub enabled: bool,
    pub target_adapter_name: String,
    pub active_profile: ProfileId,
    pub profile_a: NetworkProfile,
    pub profile_b: NetworkProfile,
}

impl Default for AutoSwitchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            target_adapter_name: String::new(),
            active_profile: ProfileId::ProfileA,
            profile_a: NetworkProfile::default_for(ProfileId::ProfileA),
            profile_b: NetworkProfile::default_for(ProfileId::ProfileB),
        }
    }
}

impl AutoSwitchConfig {
    /// Create an enabled configuration targeting one adapter
    pub fn new(
        target_adapter_name: impl Into<String>,
        profile_a: NetworkProfile,
        profile_b: NetworkProfile,
    ) -> Self {
        Self {
            enabled: true,
            target_adapter_name: target_adapter_name.into(),
            active_profile: ProfileId::ProfileA,
            profile_a,
            profile_b,
        }
    }

    /// Set which profile is active
    pub fn with_active(mut self, active: ProfileId) -> Self {
        self.active_profile = active;
        self
    }

    /// Enable or disable auto-switching
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Look up a profile by slot
    pub fn profile(&self, id: ProfileId) -> &NetworkProfile {
        match id {
            ProfileId::ProfileA => &self.profile_a,
            ProfileId::ProfileB => &self.profile_b,
        }
    }

    /// The currently active profile
    pub fn active(&self) -> &NetworkProfile {
        self.profile(self.active_profile)
    }

    /// The profile that is not active
    pub fn inactive(&self) -> &NetworkProfile {
        self.profile(self.active_profile.other())
    }

    /// First DHCP-mode profile, preferring the active one
    pub fn dhcp_profile(&self) -> Option<ProfileId> {
        [self.active_profile, self.active_profile.other()]
            .into_iter()
            .find(|id| self.profile(*id).is_dhcp())
    }

    /// Normalise both profiles and pin their ids to their slots
    pub fn normalized(mut self) -> Self {
        self.target_adapter_name = self.target_adapter_name.trim().to_string();
        self.profile_a.id = ProfileId::ProfileA;
        self.profile_b.id = ProfileId::ProfileB;
        self.profile_a = self.profile_a.normalized();
        self.profile_b = self.profile_b.normalized();
        self
    }

    /// Validate user input before it is persisted
    ///
    /// Checks that an adapter is named, both ping targets are present and
    /// every static profile carries a complete, well-formed address.
    pub fn validate(&self) -> Result<()> {
        if self.target_adapter_name.trim().is_empty() {
            return Err(Error::config_invalid("target adapter name is required"));
        }
        self.profile_a.validate()?;
        self.profile_b.validate()?;
        Ok(())
    }
}

/// Canonicalise a `RRGGBB` / `#RRGGBB` color to uppercase `#RRGGBB`
pub fn normalize_color(raw: &str) -> Option<String> {
    let hex = raw.trim().trim_start_matches('#');
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(format!("#{}", hex.to_ascii_uppercase()))
    } else {
        None
    }
}

/// Convert a dotted subnet mask to a prefix length
pub fn subnet_to_prefix(subnet: &str) -> Result<u8> {
    let mask: Ipv4Addr = subnet
        .trim()
        .parse()
        .map_err(|_| Error::config_invalid(format!("'{}' is not a subnet mask", subnet)))?;
    let bits = u32::from(mask);
    let prefix = bits.leading_ones();
    if bits.checked_shl(prefix).unwrap_or(0) != 0 {
        return Err(Error::config_invalid(format!(
            "'{}' is not a contiguous subnet mask",
            subnet
        )));
    }
    Ok(prefix as u8)
}

fn clean_dns(dns: Vec<String>) -> Vec<String> {
    dns.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
