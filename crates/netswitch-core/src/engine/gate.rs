//! Cooldown gates
//!
//! A [`CooldownGate`] refuses entry for a fixed window after it was last
//! armed. The engine composes three of them in [`CooldownGates`]:
//! minimum interval between cycles, post-switch and post-failure.

use std::time::Duration;
use tokio::time::Instant;

use crate::config::EngineConfig;

/// Why an evaluation cycle was not started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Auto-switch is disabled
    Disabled,
    /// No configuration has been saved yet
    NotConfigured,
    /// The target adapter is classified virtual or bluetooth
    IgnoredAdapter,
    /// The target adapter has no link; the next stable link-up evaluates
    LinkDown,
    /// A decision was already accepted; waiting for link-down
    Locked,
    /// Another cycle is running
    ProbeInFlight,
    /// Too soon after the previous cycle
    MinInterval,
    /// Inside the post-switch cooldown
    SwitchCooldown,
    /// Inside the post-failure cooldown
    FailureCooldown,
}

/// A single-purpose cooldown window
#[derive(Debug, Clone)]
pub struct CooldownGate {
    window: Duration,
    last: Option<Instant>,
}

impl CooldownGate {
    /// Create a gate that has never been armed
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Enter if the window has elapsed, re-arming the gate on success
    pub fn try_enter(&mut self, now: Instant) -> bool {
        if self.is_open(now) {
            self.arm(now);
            true
        } else {
            false
        }
    }

    /// Whether entry would be allowed at `now`
    pub fn is_open(&self, now: Instant) -> bool {
        self.remaining(now).is_none()
    }

    /// Time left in the window, or `None` if the gate is open
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let last = self.last?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < self.window).then(|| self.window - elapsed)
    }

    /// Start the window at `now`
    pub fn arm(&mut self, now: Instant) {
        self.last = Some(now);
    }

    /// Forget the last arming
    pub fn clear(&mut self) {
        self.last = None;
    }

    /// When the gate was last armed
    pub fn last(&self) -> Option<Instant> {
        self.last
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// The three gates a gated cycle must pass
#[derive(Debug, Clone)]
pub struct CooldownGates {
    pub min_interval: CooldownGate,
    pub post_switch: CooldownGate,
    pub post_failure: CooldownGate,
}

impl CooldownGates {
    pub fn from_settings(settings: &EngineConfig) -> Self {
        Self {
            min_interval: CooldownGate::new(settings.min_evaluation_interval()),
            post_switch: CooldownGate::new(settings.switch_cooldown()),
            post_failure: CooldownGate::new(settings.failure_cooldown()),
        }
    }

    /// Pass every gate at `now`, arming the minimum interval on success
    ///
    /// The first closed gate is reported. In practice the engine's lock
    /// covers the post-switch window: a switch always ends Locked and every
    /// way back to Unlocked clears the gates.
    pub fn try_enter(&mut self, now: Instant) -> Result<(), SkipReason> {
        if !self.post_switch.is_open(now) {
            return Err(SkipReason::SwitchCooldown);
        }
        if !self.post_failure.is_open(now) {
            return Err(SkipReason::FailureCooldown);
        }
        if !self.min_interval.try_enter(now) {
            return Err(SkipReason::MinInterval);
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.min_interval.clear();
        self.post_switch.clear();
        self.post_failure.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_try_enter_arms_window() {
        let mut gate = CooldownGate::new(Duration::from_secs(3));
        let t0 = Instant::now();

        assert!(gate.try_enter(t0));
        assert!(!gate.try_enter(t0 + Duration::from_secs(1)));
        assert_eq!(
            gate.remaining(t0 + Duration::from_secs(1)),
            Some(Duration::from_secs(2))
        );
        assert!(gate.try_enter(t0 + Duration::from_secs(3)));
        assert_eq!(gate.last(), Some(t0 + Duration::from_secs(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_reopens() {
        let mut gate = CooldownGate::new(Duration::from_secs(60));
        let now = Instant::now();
        gate.arm(now);
        assert!(!gate.is_open(now));
        gate.clear();
        assert!(gate.is_open(now));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gates_report_first_closed_gate() {
        let mut gates = CooldownGates::from_settings(&EngineConfig::default());
        let now = Instant::now();
        assert_eq!(gates.try_enter(now), Ok(()));
        assert_eq!(gates.try_enter(now), Err(SkipReason::MinInterval));

        gates.post_failure.arm(now);
        assert_eq!(gates.try_enter(now), Err(SkipReason::FailureCooldown));

        gates.post_switch.arm(now);
        assert_eq!(gates.try_enter(now), Err(SkipReason::SwitchCooldown));

        gates.clear();
        assert_eq!(gates.try_enter(now), Ok(()));
        assert_eq!(gates.min_interval.last(), Some(now));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_entry_does_not_rearm() {
        let mut gates = CooldownGates::from_settings(&EngineConfig::default());
        let t0 = Instant::now();
        gates.post_failure.arm(t0);

        let later = t0 + Duration::from_secs(10);
        assert_eq!(gates.try_enter(later), Err(SkipReason::FailureCooldown));
        assert_eq!(gates.min_interval.last(), None);

        let after_cooldown = t0 + Duration::from_secs(60);
        assert_eq!(gates.try_enter(after_cooldown), Ok(()));
    }
}
