//! Engine and watcher settings
//!
//! These are operator settings, not the user's profile configuration (see
//! [`crate::profile::AutoSwitchConfig`] for that).

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::profile::{DEFAULT_ALARM_COLOR, normalize_color};

/// Decision engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Probe attempts per reachability check (any success counts)
    #[serde(default = "default_probe_attempts")]
    pub probe_attempts: u32,

    /// Timeout of a single probe attempt (in milliseconds)
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Delay between probe attempts (in milliseconds)
    #[serde(default = "default_probe_retry_delay_ms")]
    pub probe_retry_delay_ms: u64,

    /// Consecutive unreachable cycles before the executor is consulted
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Minimum interval between two evaluation cycles (in milliseconds)
    #[serde(default = "default_min_evaluation_interval_ms")]
    pub min_evaluation_interval_ms: u64,

    /// Suppression window after a switch (in milliseconds)
    #[serde(default = "default_switch_cooldown_ms")]
    pub switch_cooldown_ms: u64,

    /// Suppression window after both profiles failed (in milliseconds)
    #[serde(default = "default_failure_cooldown_ms")]
    pub failure_cooldown_ms: u64,

    /// Delay before re-evaluating after a below-threshold failure or an
    /// executor error (in milliseconds). 0 disables the retry timer.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Never evaluate switching away from an active DHCP profile towards a
    /// static one
    #[serde(default = "default_directional_guard")]
    pub directional_guard: bool,

    /// Indicator color when both profiles are unreachable
    #[serde(default = "default_alarm_color")]
    pub alarm_color: String,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped with a warning.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn probe_retry_delay(&self) -> Duration {
        Duration::from_millis(self.probe_retry_delay_ms)
    }

    pub fn min_evaluation_interval(&self) -> Duration {
        Duration::from_millis(self.min_evaluation_interval_ms)
    }

    pub fn switch_cooldown(&self) -> Duration {
        Duration::from_millis(self.switch_cooldown_ms)
    }

    pub fn failure_cooldown(&self) -> Duration {
        Duration::from_millis(self.failure_cooldown_ms)
    }

    /// Retry delay, `None` when the retry timer is disabled
    pub fn retry_delay(&self) -> Option<Duration> {
        (self.retry_delay_ms > 0).then(|| Duration::from_millis(self.retry_delay_ms))
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.probe_attempts == 0 {
            return Err(crate::Error::config("probe_attempts must be > 0"));
        }
        if self.failure_threshold == 0 {
            return Err(crate::Error::config("failure_threshold must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event_channel_capacity must be > 0"));
        }
        if self.retry_delay_ms > 0 && self.retry_delay_ms < self.min_evaluation_interval_ms {
            return Err(crate::Error::config(format!(
                "retry_delay_ms ({}) must not be shorter than min_evaluation_interval_ms ({})",
                self.retry_delay_ms, self.min_evaluation_interval_ms
            )));
        }
        if normalize_color(&self.alarm_color).is_none() {
            return Err(crate::Error::config(format!(
                "alarm_color '{}' is not a #RRGGBB color",
                self.alarm_color
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            probe_attempts: default_probe_attempts(),
            probe_timeout_ms: default_probe_timeout_ms(),
            probe_retry_delay_ms: default_probe_retry_delay_ms(),
            failure_threshold: default_failure_threshold(),
            min_evaluation_interval_ms: default_min_evaluation_interval_ms(),
            switch_cooldown_ms: default_switch_cooldown_ms(),
            failure_cooldown_ms: default_failure_cooldown_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            directional_guard: default_directional_guard(),
            alarm_color: default_alarm_color(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_probe_attempts() -> u32 {
    2
}

fn default_probe_timeout_ms() -> u64 {
    1_000
}

fn default_probe_retry_delay_ms() -> u64 {
    300
}

fn default_failure_threshold() -> u32 {
    2
}

fn default_min_evaluation_interval_ms() -> u64 {
    3_000
}

fn default_switch_cooldown_ms() -> u64 {
    30_000
}

fn default_failure_cooldown_ms() -> u64 {
    60_000
}

fn default_retry_delay_ms() -> u64 {
    5_000
}

fn default_directional_guard() -> bool {
    true
}

fn default_alarm_color() -> String {
    DEFAULT_ALARM_COLOR.to_string()
}

fn default_event_channel_capacity() -> usize {
    256
}

/// Link watcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// How often adapter snapshots are taken (in milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long a link must stay up before it counts as stable (in milliseconds)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl WatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_ms == 0 {
            return Err(crate::Error::config("poll_interval_ms must be > 0"));
        }
        Ok(())
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_debounce_ms() -> u64 {
    3_500
}
