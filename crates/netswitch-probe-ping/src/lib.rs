// # Ping Reachability Probe
//
// This crate provides a `ReachabilityProbe` backed by the system `ping`
// binary.
//
// ## Purpose
//
// One ICMP echo per call, bounded by the caller's timeout. Retries are owned
// by the engine and the executors, never by the probe.
//
// ## Platform Notes
//
// - Linux: `ping -c 1 -W <secs> [-I <iface>] <host>`
// - macOS: `ping -c 1 -t <secs> [-b <iface>] <host>`
// - Windows: `ping -n 1 -w <ms> <host>` (no interface binding)
//
// The child is killed if the probe future is dropped or the hard deadline
// (timeout + 1 s) passes.

use async_trait::async_trait;
use netswitch_core::traits::ReachabilityProbe;

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

/// Grace added on top of ping's own timeout before the child is killed
const KILL_GRACE: Duration = Duration::from_secs(1);

#[cfg(windows)]
const DEFAULT_PROGRAM: &str = "ping.exe";
#[cfg(not(windows))]
const DEFAULT_PROGRAM: &str = "ping";

/// Reachability probe running the system `ping`
#[derive(Debug, Clone)]
pub struct PingProbe {
    /// Binary to run, looked up in `PATH` unless absolute
    program: String,

    /// Interface to send from
    interface: Option<String>,
}

impl Default for PingProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl PingProbe {
    pub fn new() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            interface: None,
        }
    }

    /// Bind probes to one interface (ignored on Windows)
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// Use a different ping binary
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl ReachabilityProbe for PingProbe {
    async fn probe(&self, host: &str, timeout: Duration) -> bool {
        let host = host.trim();
        if !is_plausible_host(host) {
            tracing::warn!("Refusing to ping suspicious target '{}'", host);
            return false;
        }

        let args = ping_args(host, timeout, self.interface.as_deref());
        tracing::trace!("{} {}", self.program, args.join(" "));

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(timeout + KILL_GRACE, child).await {
            Ok(Ok(status)) => {
                tracing::debug!("ping {} -> {}", host, status);
                status.success()
            }
            Ok(Err(e)) => {
                tracing::warn!("Failed to run {}: {}", self.program, e);
                false
            }
            Err(_) => {
                tracing::debug!("ping {} exceeded {:?}, killed", host, timeout + KILL_GRACE);
                false
            }
        }
    }

    fn is_available(&self) -> bool {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            return program.is_file();
        }
        std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
            .unwrap_or(false)
    }
}

/// Host names and addresses only; nothing `ping` could read as an option
fn is_plausible_host(host: &str) -> bool {
    !host.is_empty()
        && !host.starts_with('-')
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '%' | '_'))
}

/// Command line for one echo request
#[cfg(target_os = "windows")]
fn ping_args(host: &str, timeout: Duration, interface: Option<&str>) -> Vec<String> {
    if let Some(interface) = interface {
        tracing::debug!("Interface binding ({}) is not supported on Windows", interface);
    }
    let millis = timeout.as_millis().max(1);
    vec![
        "-n".to_string(),
        "1".to_string(),
        "-w".to_string(),
        millis.to_string(),
        host.to_string(),
    ]
}

/// Command line for one echo request
#[cfg(not(target_os = "windows"))]
fn ping_args(host: &str, timeout: Duration, interface: Option<&str>) -> Vec<String> {
    // whole seconds, rounded up, at least one
    let secs = timeout.as_millis().div_ceil(1000).max(1);

    #[cfg(target_os = "macos")]
    let (timeout_flag, interface_flag) = ("-t", "-b");
    #[cfg(not(target_os = "macos"))]
    let (timeout_flag, interface_flag) = ("-W", "-I");

    let mut args = vec![
        "-c".to_string(),
        "1".to_string(),
        timeout_flag.to_string(),
        secs.to_string(),
    ];
    if let Some(interface) = interface {
        args.push(interface_flag.to_string());
        args.push(interface.to_string());
    }
    args.push(host.to_string());
    args
}
