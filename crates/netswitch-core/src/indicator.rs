//! Indicator color selection and application
//!
//! Maps an evaluation outcome to a color and hands it to an
//! [`IndicatorSink`]. Sink failures are logged and never propagate: the
//! profile decision that produced the color stands either way.

use tracing::{debug, warn};

use crate::profile::AutoSwitchConfig;
use crate::traits::{IndicatorSink, SwitchOutcome};

/// Chooses and applies the indicator color
pub struct IndicatorController {
    sink: Box<dyn IndicatorSink>,
    alarm_color: String,
}

impl IndicatorController {
    pub fn new(sink: Box<dyn IndicatorSink>, alarm_color: impl Into<String>) -> Self {
        Self {
            sink,
            alarm_color: alarm_color.into(),
        }
    }

    pub fn alarm_color(&self) -> &str {
        &self.alarm_color
    }

    /// Pick the color for an outcome
    ///
    /// `both_failed` always shows the alarm color. Otherwise the profile whose
    /// ping target equals the target the decision was based on wins (the
    /// active one if both match), falling back to the active profile.
    pub fn select_color(
        &self,
        outcome: SwitchOutcome,
        probed_target: Option<&str>,
        config: &AutoSwitchConfig,
    ) -> String {
        if outcome == SwitchOutcome::BothFailed {
            return self.alarm_color.clone();
        }

        if let Some(target) = probed_target.map(str::trim).filter(|t| !t.is_empty()) {
            let matched = [config.active(), config.inactive()]
                .into_iter()
                .find(|p| p.ping_target.trim() == target);
            if let Some(profile) = matched {
                return profile.indicator_color.clone();
            }
            debug!(
                "Probed target {} matches no profile, using active profile color",
                target
            );
        }

        config.active().indicator_color.clone()
    }

    /// Apply `color`, returning whether the sink accepted it
    pub async fn apply(&self, color: &str) -> bool {
        match self.sink.set_indicator_color(color).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to set indicator color {}: {}", color, e);
                false
            }
        }
    }
}
