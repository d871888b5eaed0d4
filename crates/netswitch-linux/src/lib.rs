// # Linux Platform Layer
//
// This crate provides the Linux implementations of the controller's
// platform seams.
//
// ## Components
//
// - [`SysfsSnapshotSource`]: adapter snapshots from `/sys/class/net`,
//   `ip -o -4 addr`, `/proc/net/route` and `getifaddrs(3)`
// - [`NmcliApplier`]: DHCP/static/DNS application through NetworkManager's
//   `nmcli device modify`
//
// ## Platform Support
//
// Parsing and command construction compile everywhere so they can be tested
// anywhere. Address enumeration is only implemented on Linux; elsewhere
// snapshots carry no address.

mod ifaddrs;
pub mod nmcli;
pub mod sysfs;

pub use nmcli::NmcliApplier;
pub use sysfs::SysfsSnapshotSource;

use std::path::Path;

/// Whether `program` resolves to a file, directly or through `PATH`
pub fn binary_available(program: &str) -> bool {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(path).is_file()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary() {
        assert!(!binary_available("netswitch-no-such-binary"));
        assert!(!binary_available("/nonexistent/nmcli"));
    }
}
