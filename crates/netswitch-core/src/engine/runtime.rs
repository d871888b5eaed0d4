//! Transient per-engine state
//!
//! Never persisted. Reset on link-down and when auto-switch is disabled.

use tokio::time::Instant;

use super::gate::CooldownGates;
use crate::config::EngineConfig;

/// Decision engine state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Waiting for a trigger
    Unlocked,
    /// An evaluation cycle is running
    Probing,
    /// A decision was accepted; no re-evaluation until unlock
    Locked,
}

/// Runtime state owned by one `DecisionEngine`
#[derive(Debug, Clone)]
pub struct RuntimeState {
    pub state: EngineState,
    /// Last observed link state of the target adapter
    pub last_link_up: Option<bool>,
    pub consecutive_failures: u32,
    pub last_link_up_event_at: Option<Instant>,
    /// Pending retry deadline
    pub retry_at: Option<Instant>,
    pub gates: CooldownGates,
}

impl RuntimeState {
    pub fn new(settings: &EngineConfig) -> Self {
        Self {
            state: EngineState::Unlocked,
            last_link_up: None,
            consecutive_failures: 0,
            last_link_up_event_at: None,
            retry_at: None,
            gates: CooldownGates::from_settings(settings),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.state == EngineState::Locked
    }

    pub fn probe_in_flight(&self) -> bool {
        self.state == EngineState::Probing
    }

    pub fn last_switch_at(&self) -> Option<Instant> {
        self.gates.post_switch.last()
    }

    pub fn last_failure_at(&self) -> Option<Instant> {
        self.gates.post_failure.last()
    }

    /// Back to a clean Unlocked state
    ///
    /// Clears the lock, the failure counter, every cooldown and any pending
    /// retry. The observed link state is kept.
    pub fn reset(&mut self) {
        self.state = EngineState::Unlocked;
        self.consecutive_failures = 0;
        self.retry_at = None;
        self.gates.clear();
    }
}
