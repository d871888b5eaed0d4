//! Daemon-side collaborators with no platform dependency

use async_trait::async_trait;
use netswitch_core::Result;
use netswitch_core::profile::StaticConfig;
use netswitch_core::traits::{ConfigApplier, IndicatorSink};
use std::sync::Mutex;
use tracing::info;

/// Applier that only logs what it would do
///
/// For trying a configuration on a machine whose addressing must not change.
#[derive(Debug, Default)]
pub struct DryRunApplier {
    applied: Mutex<Vec<String>>,
}

impl DryRunApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations logged so far
    pub fn applied(&self) -> Vec<String> {
        self.applied
            .lock()
            .map(|ops| ops.clone())
            .unwrap_or_default()
    }

    fn record(&self, op: String) {
        info!("[dry-run] {}", op);
        if let Ok(mut ops) = self.applied.lock() {
            ops.push(op);
        }
    }
}

#[async_trait]
impl ConfigApplier for DryRunApplier {
    async fn apply_dhcp(&self, adapter_name: &str) -> Result<()> {
        self.record(format!("{}: dhcp", adapter_name));
        Ok(())
    }

    async fn apply_static(&self, adapter_name: &str, config: &StaticConfig) -> Result<()> {
        let prefix = config.prefix_len()?;
        self.record(format!(
            "{}: static {}/{} via {}",
            adapter_name, config.ip, prefix, config.gateway
        ));
        Ok(())
    }

    async fn set_dns(&self, adapter_name: &str, dns: &[String]) -> Result<()> {
        self.record(format!("{}: dns {}", adapter_name, dns.join(",")));
        Ok(())
    }
}

/// Indicator sink writing the color to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingIndicator;

#[async_trait]
impl IndicatorSink for LoggingIndicator {
    async fn set_indicator_color(&self, hex_color: &str) -> Result<()> {
        info!("Indicator color: {}", hex_color);
        Ok(())
    }
}
