//! Adapter snapshots from sysfs and procfs
//!
//! | Field            | Source                                                   |
//! |------------------|----------------------------------------------------------|
//! | link up          | `/sys/class/net/<if>/carrier`, else `operstate`          |
//! | classification   | `wireless`/`phy80211`, `device`, `uevent` DEVTYPE, `type` |
//! | address, DHCP    | `ip -o -4 addr show` (`dynamic` flag), else getifaddrs   |
//! | gateway          | default routes in `/proc/net/route`                      |
//!
//! Without `ip` an adapter is never reported as DHCP-configured, so the
//! engine falls back to probing instead of trusting a lease it cannot see.

use async_trait::async_trait;
use netswitch_core::traits::{AdapterClass, AdapterSnapshot, SnapshotSource};
use netswitch_core::{Error, Result};

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::fs;
use tokio::process::Command;

const SYS_CLASS_NET: &str = "/sys/class/net";
const PROC_NET_ROUTE: &str = "/proc/net/route";
const IP_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// `RTF_GATEWAY` from `<linux/route.h>`
const RTF_GATEWAY: u32 = 0x0002;

/// `ARPHRD_ETHER` from `<linux/if_arp.h>`
const ARPHRD_ETHER: u32 = 1;

/// IPv4 address of an interface and whether the kernel marks it dynamic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressInfo {
    pub address: Ipv4Addr,
    /// Has a finite lifetime (installed by a DHCP client)
    pub dynamic: bool,
}

/// Hints used to classify an interface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassHints {
    /// `wireless` or `phy80211` present
    pub wireless: bool,
    /// Backed by a device (`device` link present)
    pub physical: bool,
    /// `DEVTYPE=` from `uevent`
    pub devtype: Option<String>,
    /// ARPHRD type from `type`
    pub link_type: Option<u32>,
}

/// Snapshot source reading the running system
#[derive(Debug, Clone)]
pub struct SysfsSnapshotSource {
    net_class: PathBuf,
    route_table: PathBuf,
    ip_program: String,
}

impl Default for SysfsSnapshotSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SysfsSnapshotSource {
    pub fn new() -> Self {
        Self {
            net_class: PathBuf::from(SYS_CLASS_NET),
            route_table: PathBuf::from(PROC_NET_ROUTE),
            ip_program: "ip".to_string(),
        }
    }

    /// Read from alternative sysfs/procfs locations
    pub fn with_roots(net_class: impl Into<PathBuf>, route_table: impl Into<PathBuf>) -> Self {
        Self {
            net_class: net_class.into(),
            route_table: route_table.into(),
            ..Self::new()
        }
    }

    /// Use a different `ip` binary for address enumeration
    pub fn with_ip_program(mut self, program: impl Into<String>) -> Self {
        self.ip_program = program.into();
        self
    }

    async fn addresses(&self) -> HashMap<String, AddressInfo> {
        match self.ip_addresses().await {
            Ok(addresses) => return addresses,
            Err(e) => tracing::debug!("{} unusable ({}), falling back to getifaddrs", self.ip_program, e),
        }

        match crate::ifaddrs::ipv4_addresses() {
            Ok(addresses) => addresses
                .into_iter()
                .map(|(name, address)| {
                    (
                        name,
                        AddressInfo {
                            address,
                            dynamic: false,
                        },
                    )
                })
                .collect(),
            Err(e) => {
                tracing::warn!("Failed to enumerate interface addresses: {}", e);
                HashMap::new()
            }
        }
    }

    async fn ip_addresses(&self) -> Result<HashMap<String, AddressInfo>> {
        let output = Command::new(&self.ip_program)
            .args(["-o", "-4", "addr", "show"])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(IP_COMMAND_TIMEOUT, output)
            .await
            .map_err(|_| Error::snapshot(format!("{} timed out", self.ip_program)))??;

        if !output.status.success() {
            return Err(Error::snapshot(format!(
                "{} exited with {}",
                self.ip_program, output.status
            )));
        }
        Ok(parse_ip_addr(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn gateways(&self) -> HashMap<String, Ipv4Addr> {
        match fs::read_to_string(&self.route_table).await {
            Ok(text) => parse_default_gateways(&text),
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", self.route_table.display(), e);
                HashMap::new()
            }
        }
    }
}

#[async_trait]
impl SnapshotSource for SysfsSnapshotSource {
    async fn snapshots(&self) -> Result<Vec<AdapterSnapshot>> {
        let mut dir = fs::read_dir(&self.net_class).await.map_err(|e| {
            Error::snapshot(format!("Failed to list {}: {}", self.net_class.display(), e))
        })?;

        let addresses = self.addresses().await;
        let gateways = self.gateways().await;

        let mut out = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == "lo" {
                continue;
            }
            let path = entry.path();

            let classification = classify(&name, &read_hints(&path).await);
            let mut snapshot =
                AdapterSnapshot::new(name.clone(), classification).with_link(read_link_up(&path).await);

            let gateway = gateways.get(&name).map(ToString::to_string).unwrap_or_default();
            if let Some(info) = addresses.get(&name) {
                snapshot = if info.dynamic {
                    snapshot.with_dhcp_lease(info.address.to_string(), gateway)
                } else {
                    snapshot.with_static_address(info.address.to_string(), gateway)
                };
            } else {
                snapshot.gateway = gateway;
            }

            out.push(snapshot);
        }

        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}

/// Carrier if readable (it is not while the interface is administratively down)
async fn read_link_up(path: &Path) -> bool {
    match read_trimmed(&path.join("carrier")).await {
        Some(carrier) => carrier == "1",
        None => read_trimmed(&path.join("operstate"))
            .await
            .is_some_and(|state| state == "up"),
    }
}

async fn read_hints(path: &Path) -> ClassHints {
    let devtype = read_trimmed(&path.join("uevent")).await.and_then(|uevent| {
        uevent
            .lines()
            .find_map(|line| line.strip_prefix("DEVTYPE="))
            .map(|v| v.trim().to_string())
    });

    ClassHints {
        wireless: exists(&path.join("wireless")).await || exists(&path.join("phy80211")).await,
        physical: exists(&path.join("device")).await,
        devtype,
        link_type: read_trimmed(&path.join("type"))
            .await
            .and_then(|t| t.parse().ok()),
    }
}

async fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .await
        .ok()
        .map(|s| s.trim().to_string())
}

async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// Classify an interface from its name and sysfs hints
pub fn classify(name: &str, hints: &ClassHints) -> AdapterClass {
    let devtype = hints.devtype.as_deref();
    if devtype == Some("bluetooth") || name.starts_with("bnep") {
        return AdapterClass::Bluetooth;
    }
    if hints.wireless || devtype == Some("wlan") {
        return AdapterClass::Wifi;
    }
    if !hints.physical {
        return AdapterClass::Virtual;
    }
    match hints.link_type {
        Some(ARPHRD_ETHER) | None => AdapterClass::Ethernet,
        Some(_) => AdapterClass::Other,
    }
}

/// Parse `ip -o -4 addr show`
///
/// ```text
/// 2: eth0    inet 192.168.1.20/24 brd 192.168.1.255 scope global dynamic noprefixroute eth0\       valid_lft 86396sec preferred_lft 86396sec
/// ```
pub fn parse_ip_addr(text: &str) -> HashMap<String, AddressInfo> {
    let mut out: HashMap<String, AddressInfo> = HashMap::new();

    for line in text.lines() {
        let mut tokens = line.split_whitespace();
        let (Some(_index), Some(name), Some("inet"), Some(cidr)) =
            (tokens.next(), tokens.next(), tokens.next(), tokens.next())
        else {
            continue;
        };
        let name = name.split('@').next().unwrap_or(name).trim_end_matches(':');
        let Some(address) = cidr.split('/').next().and_then(|a| a.parse::<Ipv4Addr>().ok())
        else {
            continue;
        };
        let dynamic = tokens.any(|t| t == "dynamic");

        let info = AddressInfo { address, dynamic };
        match out.get(name) {
            Some(existing) if !existing.address.is_link_local() => {}
            _ => {
                out.insert(name.to_string(), info);
            }
        }
    }

    out
}

/// Default-route gateway per interface from `/proc/net/route`
///
/// The lowest metric wins when an interface has several default routes.
pub fn parse_default_gateways(text: &str) -> HashMap<String, Ipv4Addr> {
    let mut best: HashMap<String, (u32, Ipv4Addr)> = HashMap::new();

    for line in text.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 8 {
            continue;
        }
        let (iface, destination, gateway, flags, metric, mask) =
            (fields[0], fields[1], fields[2], fields[3], fields[6], fields[7]);

        if destination != "00000000" || mask != "00000000" {
            continue;
        }
        let (Ok(gateway), Ok(flags), Ok(metric)) = (
            u32::from_str_radix(gateway, 16),
            u32::from_str_radix(flags, 16),
            metric.parse::<u32>(),
        ) else {
            continue;
        };
        if flags & RTF_GATEWAY == 0 {
            continue;
        }

        // the kernel prints the network-order address as a host integer
        let gateway = Ipv4Addr::from(gateway.to_ne_bytes());
        match best.get(iface) {
            Some((m, _)) if *m <= metric => {}
            _ => {
                best.insert(iface.to_string(), (metric, gateway));
            }
        }
    }

    best.into_iter().map(|(k, (_, gw))| (k, gw)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const IP_ADDR: &str = "\
1: lo    inet 127.0.0.1/8 scope host lo\\       valid_lft forever preferred_lft forever
2: eth0    inet 169.254.3.4/16 brd 169.254.255.255 scope link eth0\\       valid_lft forever preferred_lft forever
2: eth0    inet 192.168.1.20/24 brd 192.168.1.255 scope global dynamic noprefixroute eth0\\       valid_lft 86396sec preferred_lft 86396sec
3: enp3s0    inet 172.16.1.55/24 brd 172.16.1.255 scope global noprefixroute enp3s0\\       valid_lft forever preferred_lft forever
5: veth1@if4    inet 10.0.0.2/24 scope global veth1\\       valid_lft forever preferred_lft forever
";

    #[test]
    fn test_parse_ip_addr() {
        let addrs = parse_ip_addr(IP_ADDR);
        assert_eq!(
            addrs["eth0"],
            AddressInfo {
                address: Ipv4Addr::new(192, 168, 1, 20),
                dynamic: true,
            }
        );
        assert_eq!(
            addrs["enp3s0"],
            AddressInfo {
                address: Ipv4Addr::new(172, 16, 1, 55),
                dynamic: false,
            }
        );
        assert_eq!(addrs["veth1"].address, Ipv4Addr::new(10, 0, 0, 2));
        assert!(!addrs["lo"].dynamic);
    }

    #[test]
    fn test_parse_ip_addr_ignores_garbage() {
        assert!(parse_ip_addr("").is_empty());
        assert!(parse_ip_addr("2: eth0    inet6 fe80::1/64 scope link").is_empty());
        assert!(parse_ip_addr("2: eth0    inet nonsense").is_empty());
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn test_parse_default_gateways() {
        let table = "\
Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT
eth0\t00000000\t0101A8C0\t0003\t0\t0\t600\t00000000\t0\t0\t0
eth0\t00000000\t0201A8C0\t0003\t0\t0\t100\t00000000\t0\t0\t0
eth0\t0001A8C0\t00000000\t0001\t0\t0\t100\t00FFFFFF\t0\t0\t0
wlan0\t00000000\t00000000\t0001\t0\t0\t100\t00000000\t0\t0\t0
enp3s0\t00000000\tFE0110AC\t0003\t0\t0\t100\t00000000\t0\t0\t0
";
        let gws = parse_default_gateways(table);
        assert_eq!(gws["eth0"], Ipv4Addr::new(192, 168, 1, 2));
        assert_eq!(gws["enp3s0"], Ipv4Addr::new(172, 16, 1, 254));
        assert!(!gws.contains_key("wlan0"));
    }

    #[test]
    fn test_classify() {
        let physical = ClassHints {
            physical: true,
            link_type: Some(1),
            ..ClassHints::default()
        };
        assert_eq!(classify("enp3s0", &physical), AdapterClass::Ethernet);
        assert_eq!(classify("docker0", &ClassHints::default()), AdapterClass::Virtual);
        assert_eq!(
            classify(
                "wlp2s0",
                &ClassHints {
                    wireless: true,
                    ..physical.clone()
                }
            ),
            AdapterClass::Wifi
        );
        assert_eq!(classify("bnep0", &physical), AdapterClass::Bluetooth);
        assert_eq!(
            classify(
                "wwan0",
                &ClassHints {
                    link_type: Some(519),
                    ..physical
                }
            ),
            AdapterClass::Other
        );
    }

    async fn fake_interface(root: &Path, name: &str, carrier: Option<&str>, physical: bool) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).await.unwrap();
        if let Some(carrier) = carrier {
            fs::write(dir.join("carrier"), format!("{}\n", carrier)).await.unwrap();
        }
        fs::write(dir.join("operstate"), "down\n").await.unwrap();
        fs::write(dir.join("type"), "1\n").await.unwrap();
        if physical {
            fs::create_dir_all(dir.join("device")).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_snapshots_from_fake_tree() {
        let tmp = TempDir::new().unwrap();
        let net = tmp.path().join("net");
        fake_interface(&net, "lo", Some("1"), false).await;
        fake_interface(&net, "eth0", Some("1"), true).await;
        fake_interface(&net, "eth1", None, true).await;
        fake_interface(&net, "docker0", Some("0"), false).await;

        let source = SysfsSnapshotSource::with_roots(&net, tmp.path().join("missing-route"))
            .with_ip_program("netswitch-no-such-ip-binary");
        let snapshots = source.snapshots().await.unwrap();

        let names: Vec<&str> = snapshots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["docker0", "eth0", "eth1"]);

        let eth0 = source.snapshot("eth0").await.unwrap().unwrap();
        assert!(eth0.is_enabled);
        assert_eq!(eth0.classification, AdapterClass::Ethernet);
        // no `ip`: never reported as a lease
        assert!(!eth0.has_valid_lease());

        assert!(!snapshots[2].is_enabled);
        assert_eq!(snapshots[0].classification, AdapterClass::Virtual);
    }

    #[tokio::test]
    async fn test_missing_class_dir_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let source = SysfsSnapshotSource::with_roots(tmp.path().join("nope"), "/nonexistent");
        assert!(source.snapshots().await.is_err());
    }
}
