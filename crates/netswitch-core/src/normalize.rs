//! Loading persisted JSON into an [`AutoSwitchConfig`]
//!
//! Stored configurations come in three shapes:
//!
//! - **current**: `profileA` / `profileB` / `activeProfile` / `targetAdapterName`
//! - **two-network**: `network1` / `network2` / `currentActive` / `adapterName`,
//!   profiles carrying `dhcp.dns` and `trayColor`
//! - **legacy single-profile**: `dhcpConfig` / `staticConfig` /
//!   `dhcpPingTarget` / `staticPingTarget`, an implicit DHCP "external" side
//!   and static "internal" side
//!
//! The walk is done over [`serde_json::Value`] rather than through derived
//! deserializers so that a wrong type in one field only defaults that field.

use serde_json::{Map, Value};

use crate::profile::{
    AutoSwitchConfig, NetworkProfile, ProfileId, ProfileMode, StaticConfig, DEFAULT_PING_TARGET,
    normalize_color,
};

/// Which stored shape a configuration was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigShape {
    Current,
    TwoNetwork,
    LegacySingle,
}

impl ConfigShape {
    /// Whether the stored value has to be rewritten in the current shape
    pub fn needs_migration(self) -> bool {
        self != ConfigShape::Current
    }
}

/// Result of normalising a stored value
#[derive(Debug, Clone)]
pub struct Normalized {
    pub config: AutoSwitchConfig,
    pub shape: ConfigShape,
}

/// Normalise any accepted stored shape into a fully populated configuration
///
/// Never fails: anything unreadable falls back to the documented default.
pub fn normalize(value: &Value) -> Normalized {
    let empty = Map::new();
    let obj = value.as_object().unwrap_or(&empty);
    let shape = detect_shape(obj);

    let config = match shape {
        ConfigShape::Current => from_current(obj),
        ConfigShape::TwoNetwork => from_two_network(obj),
        ConfigShape::LegacySingle => from_legacy(obj),
    };

    Normalized {
        config: config.normalized(),
        shape,
    }
}

fn detect_shape(obj: &Map<String, Value>) -> ConfigShape {
    if obj.contains_key("profileA") || obj.contains_key("profileB") {
        ConfigShape::Current
    } else if obj.contains_key("network1") || obj.contains_key("network2") {
        ConfigShape::TwoNetwork
    } else if obj.contains_key("dhcpConfig")
        || obj.contains_key("dhcpPingTarget")
        || obj.contains_key("staticPingTarget")
        || obj.contains_key("staticConfig")
    {
        ConfigShape::LegacySingle
    } else {
        ConfigShape::Current
    }
}

fn from_current(obj: &Map<String, Value>) -> AutoSwitchConfig {
    AutoSwitchConfig {
        enabled: bool_field(obj, "enabled"),
        target_adapter_name: str_field(obj, &["targetAdapterName", "adapterName"])
            .unwrap_or_default(),
        active_profile: profile_id(obj, &["activeProfile", "currentActive"]),
        profile_a: profile(obj.get("profileA"), ProfileId::ProfileA),
        profile_b: profile(obj.get("profileB"), ProfileId::ProfileB),
    }
}

fn from_two_network(obj: &Map<String, Value>) -> AutoSwitchConfig {
    AutoSwitchConfig {
        enabled: bool_field(obj, "enabled"),
        target_adapter_name: str_field(obj, &["adapterName", "targetAdapterName"])
            .unwrap_or_default(),
        active_profile: profile_id(obj, &["currentActive", "activeProfile"]),
        profile_a: profile(obj.get("network1"), ProfileId::ProfileA),
        profile_b: profile(obj.get("network2"), ProfileId::ProfileB),
    }
}

fn from_legacy(obj: &Map<String, Value>) -> AutoSwitchConfig {
    let dhcp_dns = obj
        .get("dhcpConfig")
        .and_then(Value::as_object)
        .map(|d| dns_list(d.get("dns")))
        .unwrap_or_default();

    let static_config = static_config(obj.get("staticConfig"));

    let dhcp_target =
        str_field(obj, &["dhcpPingTarget"]).unwrap_or_else(|| DEFAULT_PING_TARGET.to_string());
    let static_target = str_field(obj, &["staticPingTarget"])
        .or_else(|| non_empty(&static_config.gateway))
        .unwrap_or_else(|| DEFAULT_PING_TARGET.to_string());

    AutoSwitchConfig {
        enabled: bool_field(obj, "enabled"),
        target_adapter_name: str_field(obj, &["adapterName"]).unwrap_or_default(),
        active_profile: ProfileId::ProfileA,
        profile_a: NetworkProfile::dhcp(ProfileId::ProfileA, dhcp_target).with_dhcp_dns(dhcp_dns),
        profile_b: NetworkProfile::with_static(ProfileId::ProfileB, static_config, static_target),
    }
}

fn profile(value: Option<&Value>, id: ProfileId) -> NetworkProfile {
    let defaults = NetworkProfile::default_for(id);
    let Some(obj) = value.and_then(Value::as_object) else {
        return defaults;
    };

    let mode = match str_field(obj, &["mode"]).as_deref().map(str::to_ascii_lowercase) {
        Some(m) if m == "dhcp" => ProfileMode::Dhcp,
        Some(m) if m == "static" => ProfileMode::Static,
        _ => defaults.mode,
    };

    let dhcp_dns = if obj.contains_key("dhcpDns") {
        dns_list(obj.get("dhcpDns"))
    } else {
        obj.get("dhcp")
            .and_then(Value::as_object)
            .map(|d| dns_list(d.get("dns")))
            .unwrap_or_default()
    };

    let indicator_color = str_field(obj, &["indicatorColor", "trayColor"])
        .and_then(|c| normalize_color(&c))
        .unwrap_or(defaults.indicator_color);

    NetworkProfile {
        id,
        mode,
        dhcp_dns,
        static_config: static_config(obj.get("staticConfig")),
        ping_target: str_field(obj, &["pingTarget"]).unwrap_or(defaults.ping_target),
        indicator_color,
    }
}

fn static_config(value: Option<&Value>) -> StaticConfig {
    let Some(obj) = value.and_then(Value::as_object) else {
        return StaticConfig::default();
    };
    StaticConfig {
        ip: str_field(obj, &["ip"]).unwrap_or_default(),
        subnet: str_field(obj, &["subnet"]).unwrap_or_default(),
        gateway: str_field(obj, &["gateway"]).unwrap_or_default(),
        dns: dns_list(obj.get("dns")),
    }
}

fn profile_id(obj: &Map<String, Value>, keys: &[&str]) -> ProfileId {
    match str_field(obj, keys).as_deref() {
        Some("profileB") | Some("network2") => ProfileId::ProfileB,
        _ => ProfileId::ProfileA,
    }
}

/// First non-blank string among `keys`
fn str_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .find_map(non_empty)
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// DNS servers as an array of strings or a comma-separated string
fn dns_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(non_empty)
            .collect(),
        Some(Value::String(s)) => s.split(',').filter_map(non_empty).collect(),
        _ => Vec::new(),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{DEFAULT_COLOR_A, DEFAULT_COLOR_B};
    use serde_json::json;

    #[test]
    fn test_partial_static_profile_is_filled() {
        let value = json!({
            "enabled": true,
            "targetAdapterName": "Ethernet",
            "activeProfile": "profileB",
            "profileB": { "mode": "static", "staticConfig": { "ip": "10.0.0.5" } }
        });

        let n = normalize(&value);
        assert_eq!(n.shape, ConfigShape::Current);
        let b = &n.config.profile_b;
        assert_eq!(b.mode, ProfileMode::Static);
        assert_eq!(b.static_config.ip, "10.0.0.5");
        assert!(b.static_config.dns.is_empty());
        assert!(b.static_config.gateway.is_empty());
        assert_eq!(b.ping_target, DEFAULT_PING_TARGET);
        assert_eq!(b.indicator_color, DEFAULT_COLOR_B);
        assert_eq!(n.config.active_profile, ProfileId::ProfileB);
        assert_eq!(n.config.profile_a, NetworkProfile::default_for(ProfileId::ProfileA));
    }

    #[test]
    fn test_two_network_shape() {
        let value = json!({
            "enabled": true,
            "adapterName": "以太网",
            "currentActive": "network2",
            "network1": {
                "mode": "dhcp",
                "dhcp": { "dns": ["192.168.1.250", "114.114.114.114"] },
                "pingTarget": "baidu.com",
                "trayColor": "#00ff00"
            },
            "network2": {
                "mode": "static",
                "staticConfig": {
                    "ip": "172.16.1.55", "subnet": "255.255.255.0",
                    "gateway": "172.16.1.254", "dns": ["172.16.1.6"]
                },
                "pingTarget": "172.16.1.254",
                "trayColor": "#FFA500"
            }
        });

        let n = normalize(&value);
        assert_eq!(n.shape, ConfigShape::TwoNetwork);
        assert!(n.shape.needs_migration());
        assert_eq!(n.config.target_adapter_name, "以太网");
        assert_eq!(n.config.active_profile, ProfileId::ProfileB);
        assert_eq!(n.config.profile_a.dhcp_dns.len(), 2);
        assert_eq!(n.config.profile_a.indicator_color, "#00FF00");
        assert_eq!(n.config.profile_b.static_config.gateway, "172.16.1.254");
    }

    #[test]
    fn test_legacy_single_profile_shape() {
        let value = json!({
            "enabled": false,
            "adapterName": "Ethernet",
            "dhcpConfig": { "dns": "192.168.1.250, 114.114.114.114" },
            "staticConfig": {
                "ip": "172.16.1.55", "subnet": "255.255.255.0", "gateway": "172.16.1.254"
            },
            "dhcpPingTarget": "baidu.com"
        });

        let n = normalize(&value);
        assert_eq!(n.shape, ConfigShape::LegacySingle);
        let c = &n.config;
        assert_eq!(c.profile_a.mode, ProfileMode::Dhcp);
        assert_eq!(
            c.profile_a.dhcp_dns,
            vec!["192.168.1.250".to_string(), "114.114.114.114".to_string()]
        );
        assert_eq!(c.profile_b.mode, ProfileMode::Static);
        // static side falls back to its gateway as ping target
        assert_eq!(c.profile_b.ping_target, "172.16.1.254");
        assert_eq!(c.profile_a.indicator_color, DEFAULT_COLOR_A);
        assert_eq!(c.active_profile, ProfileId::ProfileA);
    }

    #[test]
    fn test_wrong_types_default_only_that_field() {
        let value = json!({
            "enabled": "yes",
            "targetAdapterName": 42,
            "profileA": { "mode": 7, "pingTarget": "1.1.1.1", "dhcpDns": {"x": 1} }
        });
        let n = normalize(&value);
        assert!(!n.config.enabled);
        assert_eq!(n.config.target_adapter_name, "");
        assert_eq!(n.config.profile_a.mode, ProfileMode::Dhcp);
        assert_eq!(n.config.profile_a.ping_target, "1.1.1.1");
        assert!(n.config.profile_a.dhcp_dns.is_empty());
    }

    #[test]
    fn test_non_object_yields_defaults() {
        let n = normalize(&json!(null));
        assert_eq!(n.config, AutoSwitchConfig::default());
    }
}
