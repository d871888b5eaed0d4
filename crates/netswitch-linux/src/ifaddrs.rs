//! IPv4 address enumeration through `getifaddrs(3)` (`nix::ifaddrs`)

use std::collections::HashMap;
use std::net::Ipv4Addr;

/// First usable IPv4 address per interface
///
/// A link-local (169.254/16) address is only reported when the interface
/// has nothing better.
#[cfg(target_os = "linux")]
pub(crate) fn ipv4_addresses() -> std::io::Result<HashMap<String, Ipv4Addr>> {
    let mut out = HashMap::new();
    for ifaddr in nix::ifaddrs::getifaddrs().map_err(std::io::Error::from)? {
        let Some(addr) = ifaddr
            .address
            .as_ref()
            .and_then(|storage| storage.as_sockaddr_in())
            .map(|sin| sin.ip())
        else {
            continue;
        };
        record(&mut out, ifaddr.interface_name, addr);
    }
    Ok(out)
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn ipv4_addresses() -> std::io::Result<HashMap<String, Ipv4Addr>> {
    Ok(HashMap::new())
}

fn record(out: &mut HashMap<String, Ipv4Addr>, name: String, addr: Ipv4Addr) {
    match out.get(&name) {
        Some(existing) if !existing.is_link_local() => {}
        _ => {
            out.insert(name, addr);
        }
    }
}
