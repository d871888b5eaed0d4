//! NetworkManager applier
//!
//! Every operation is a single `nmcli device modify`, which changes the
//! live device configuration without rewriting the saved connection.

use async_trait::async_trait;
use netswitch_core::profile::StaticConfig;
use netswitch_core::traits::ConfigApplier;
use netswitch_core::{Error, Result};

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// [`ConfigApplier`] driving `nmcli`
#[derive(Debug, Clone)]
pub struct NmcliApplier {
    program: String,
    timeout: Duration,
}

impl Default for NmcliApplier {
    fn default() -> Self {
        Self::new()
    }
}

impl NmcliApplier {
    pub fn new() -> Self {
        Self {
            program: "nmcli".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Use a different `nmcli` binary
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether `nmcli` can be found
    pub fn is_available(&self) -> bool {
        crate::binary_available(&self.program)
    }

    async fn run(&self, args: Vec<String>) -> Result<()> {
        tracing::debug!("{} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| Error::applier(format!("{} timed out after {:?}", self.program, self.timeout)))?
            .map_err(|e| Error::applier(format!("Failed to run {}: {}", self.program, e)))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(Error::applier(format!(
            "{} exited with {}: {}",
            self.program,
            output.status,
            stderr.trim()
        )))
    }
}

#[async_trait]
impl ConfigApplier for NmcliApplier {
    async fn apply_dhcp(&self, adapter_name: &str) -> Result<()> {
        self.run(dhcp_args(adapter_name)).await
    }

    async fn apply_static(&self, adapter_name: &str, config: &StaticConfig) -> Result<()> {
        let args = static_args(adapter_name, config)?;
        self.run(args).await
    }

    async fn set_dns(&self, adapter_name: &str, dns: &[String]) -> Result<()> {
        self.run(dns_args(adapter_name, dns)).await
    }
}

fn modify(adapter_name: &str) -> Vec<String> {
    vec![
        "device".to_string(),
        "modify".to_string(),
        adapter_name.to_string(),
    ]
}

fn push(args: &mut Vec<String>, key: &str, value: impl Into<String>) {
    args.push(key.to_string());
    args.push(value.into());
}

/// Automatic addressing with every manual setting cleared
pub fn dhcp_args(adapter_name: &str) -> Vec<String> {
    let mut args = modify(adapter_name);
    push(&mut args, "ipv4.method", "auto");
    push(&mut args, "ipv4.addresses", "");
    push(&mut args, "ipv4.gateway", "");
    push(&mut args, "ipv4.dns", "");
    push(&mut args, "ipv4.ignore-auto-dns", "no");
    args
}

/// Manual address, gateway and (optional) DNS servers
pub fn static_args(adapter_name: &str, config: &StaticConfig) -> Result<Vec<String>> {
    let prefix = config.prefix_len()?;
    let mut args = modify(adapter_name);
    push(&mut args, "ipv4.method", "manual");
    push(
        &mut args,
        "ipv4.addresses",
        format!("{}/{}", config.ip.trim(), prefix),
    );
    push(&mut args, "ipv4.gateway", config.gateway.trim());
    push(&mut args, "ipv4.dns", config.dns.join(","));
    push(
        &mut args,
        "ipv4.ignore-auto-dns",
        if config.dns.is_empty() { "no" } else { "yes" },
    );
    Ok(args)
}

/// DNS override on top of whatever addressing is active
pub fn dns_args(adapter_name: &str, dns: &[String]) -> Vec<String> {
    let mut args = modify(adapter_name);
    push(&mut args, "ipv4.dns", dns.join(","));
    push(
        &mut args,
        "ipv4.ignore-auto-dns",
        if dns.is_empty() { "no" } else { "yes" },
    );
    args
}
