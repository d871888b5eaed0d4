// # Indicator Sink Trait
//
// Where the decided indicator color goes (tray icon, status LED, log line).

use async_trait::async_trait;

/// Trait for indicator color setters
///
/// Failures are reported but never undo a profile decision.
#[async_trait]
pub trait IndicatorSink: Send + Sync {
    /// Show `hex_color` (`#RRGGBB`)
    async fn set_indicator_color(&self, hex_color: &str) -> Result<(), crate::Error>;
}
