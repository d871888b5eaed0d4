//! Core decision engine
//!
//! The DecisionEngine is responsible for:
//! - Consuming link events for the target adapter
//! - Gating evaluations (lock, in-flight guard, cooldowns)
//! - Running one evaluation cycle at a time
//! - Persisting the accepted profile and requesting an indicator color
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐                      ┌──────────────┐
//! │ LinkSource  │─── LinkEvent ───┐    │ EngineHandle │─── commands ───┐
//! └─────────────┘                 │    └──────────────┘                │
//!                                 ▼                                    ▼
//!                            ┌────────────────────────────────────────────┐
//!                            │               DecisionEngine               │
//!                            └────────────────────────────────────────────┘
//!                                                  │
//!      ┌──────────────────┬────────────────────────┼───────────────────┬──────────────┐
//!      ▼                  ▼                        ▼                   ▼              ▼
//! ┌──────────┐   ┌──────────────────┐   ┌──────────────────┐   ┌──────────────┐ ┌────────┐
//! │ Snapshot │   │ ReachabilityProbe│   │ SwitchExecutor   │   │ ProfileStore │ │ Events │
//! │ (lease)  │   │ (active target)  │   │ (stay / switch)  │   │ (persist)    │ │        │
//! └──────────┘   └──────────────────┘   └──────────────────┘   └──────────────┘ └────────┘
//! ```
//!
//! ## State Machine
//!
//! ```text
//!             stable link-up (gated)      decision accepted
//!  UNLOCKED ───────────────────────► PROBING ───────────────► LOCKED
//!     ▲  ▲                              │                       │
//!     │  └── below threshold / ─────────┘                       │
//!     │      both failed / executor error                       │
//!     └──────────────────────── link-down ──────────────────────┘
//! ```
//!
//! `configure()` with auto-switch enabled and re-enabling force a cycle
//! regardless of lock and cooldowns.
//!
//! ## Evaluation Cycle
//!
//! First match wins:
//! 1. Hard-lease guard: the adapter holds a valid DHCP lease and a profile is
//!    DHCP-mode → lock that profile, no probing
//! 2. Directional guard: active profile is DHCP, the other static → stay
//! 3. Probe the active target; below the failure threshold → retry later,
//!    at the threshold → ask the `SwitchExecutor`

mod gate;
mod handle;
mod runtime;

pub use gate::{CooldownGate, CooldownGates, SkipReason};
pub use handle::EngineHandle;
pub use runtime::{EngineState, RuntimeState};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, trace, warn};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::indicator::IndicatorController;
use crate::profile::{AutoSwitchConfig, DEFAULT_ALARM_COLOR, ProfileId, normalize_color};
use crate::state::ProfileStore;
use crate::traits::{
    Decision, IndicatorSink, LinkEvent, LinkSource, ReachabilityProbe, SnapshotSource,
    SwitchExecutor, SwitchOutcome, probe_with_retries,
};
use handle::EngineCommand;

const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// What started an evaluation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A configuration was saved with auto-switch enabled
    UserConfigure,
    /// Auto-switch was switched on
    Enabled,
    /// The target link came up and stayed up
    StableLinkUp,
    /// Follow-up after a below-threshold failure or an executor error
    Retry,
    /// The run loop started with auto-switch enabled
    Startup,
}

impl Trigger {
    /// Forced triggers bypass the lock and every cooldown
    pub fn is_forced(self) -> bool {
        matches!(self, Trigger::UserConfigure | Trigger::Enabled)
    }
}

/// Why a decision was locked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockReason {
    /// The adapter already holds a valid DHCP lease
    HardLease,
    /// Active DHCP profile is never traded for a static one
    DirectionalGuard,
    /// The active profile answered the probe
    Reachable,
    /// The switch executor decided
    Executor,
}

/// Why the engine returned to Unlocked outside of a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockReason {
    LinkDown,
    Disabled,
}

/// Result of one call to [`DecisionEngine::evaluate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleResult {
    /// No cycle was started
    Skipped(SkipReason),
    /// A decision was accepted
    Locked { active: ProfileId, reason: LockReason },
    /// The active profile is unreachable but the threshold is not reached
    Retrying { failures: u32 },
    /// Neither profile is reachable
    BothFailed,
    /// The executor returned an error
    ExecutorFailed,
    /// Auto-switch was disabled while the cycle ran
    Discarded,
}

/// Events emitted by the DecisionEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine run loop started
    Started {
        adapter: Option<String>,
        enabled: bool,
    },

    /// Evaluation cycle started
    CycleStarted { trigger: Trigger },

    /// Evaluation refused
    CycleSkipped {
        trigger: Trigger,
        reason: SkipReason,
    },

    /// Active target unreachable, below the failure threshold
    ProbeFailed {
        target: String,
        consecutive_failures: u32,
    },

    /// Active profile changed
    Switched { from: ProfileId, to: ProfileId },

    /// Decision accepted
    Locked {
        active: ProfileId,
        reason: LockReason,
    },

    /// Neither profile reachable
    BothFailed { active: ProfileId },

    /// Executor error; retried later
    ExecutorFailed { error: String },

    /// Back to Unlocked
    Unlocked { reason: UnlockReason },

    /// Indicator color accepted by the sink
    IndicatorApplied { color: String },

    /// Configuration saved or enabled flag changed
    ConfigChanged { enabled: bool },

    /// Engine stopped
    Stopped { reason: String },
}

enum CycleOutcome {
    Ignored,
    NoLink,
    Accepted {
        decision: Decision,
        reason: LockReason,
    },
    BelowThreshold {
        target: String,
        failures: u32,
    },
    BothFailed(Decision),
    ExecutorFailed(Error),
}

/// Core decision engine
///
/// ## Lifecycle
///
/// 1. Create with [`DecisionEngine::new()`]
/// 2. Hand out [`EngineHandle`]s with [`DecisionEngine::handle()`]
/// 3. Start with [`DecisionEngine::run()`]
/// 4. Engine runs until shutdown signal received
///
/// The methods `configure`, `set_enabled`, `handle_link_event` and
/// `evaluate` can also be driven directly (without `run`) by embedders that
/// own their event loop.
///
/// ## Concurrency
///
/// Everything runs on the task that owns the engine. Exactly one cycle can
/// be in flight; commands and link events that arrive meanwhile are queued
/// and see the state the cycle left behind.
pub struct DecisionEngine {
    snapshots: Arc<dyn SnapshotSource>,
    probe: Arc<dyn ReachabilityProbe>,

    /// Primary executor
    executor: Box<dyn SwitchExecutor>,

    /// Used when the primary is unavailable
    fallback: Option<Box<dyn SwitchExecutor>>,

    indicator: IndicatorController,
    store: ProfileStore,
    settings: EngineConfig,
    runtime: RuntimeState,

    /// Shared with every `EngineHandle`
    enabled: Arc<AtomicBool>,

    event_tx: mpsc::Sender<EngineEvent>,
    command_tx: mpsc::Sender<EngineCommand>,
    command_rx: Option<mpsc::Receiver<EngineCommand>>,
}

impl DecisionEngine {
    /// Create a new decision engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        snapshots: Arc<dyn SnapshotSource>,
        probe: Arc<dyn ReachabilityProbe>,
        executor: Box<dyn SwitchExecutor>,
        indicator: Box<dyn IndicatorSink>,
        store: ProfileStore,
        settings: EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        settings.validate()?;

        let (event_tx, event_rx) = mpsc::channel(settings.event_channel_capacity);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let alarm_color = normalize_color(&settings.alarm_color)
            .unwrap_or_else(|| DEFAULT_ALARM_COLOR.to_string());
        let enabled = store.config().is_some_and(|c| c.enabled);

        let engine = Self {
            snapshots,
            probe,
            executor,
            fallback: None,
            indicator: IndicatorController::new(indicator, alarm_color),
            store,
            runtime: RuntimeState::new(&settings),
            settings,
            enabled: Arc::new(AtomicBool::new(enabled)),
            event_tx,
            command_tx,
            command_rx: Some(command_rx),
        };

        Ok((engine, event_rx))
    }

    /// Add an executor used when the primary reports itself unavailable
    pub fn with_fallback_executor(mut self, fallback: Box<dyn SwitchExecutor>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Get a handle for controlling the engine while it runs
    pub fn handle(&self) -> EngineHandle {
        EngineHandle::new(self.command_tx.clone(), Arc::clone(&self.enabled))
    }

    /// Current configuration
    pub fn config(&self) -> Option<&AutoSwitchConfig> {
        self.store.config()
    }

    pub fn state(&self) -> EngineState {
        self.runtime.state
    }

    pub fn runtime(&self) -> &RuntimeState {
        &self.runtime
    }

    pub fn settings(&self) -> &EngineConfig {
        &self.settings
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Validate, persist and (if enabled) immediately evaluate a configuration
    ///
    /// Invalid input returns [`Error::ConfigInvalid`] and changes nothing.
    pub async fn configure(&mut self, config: AutoSwitchConfig) -> Result<Option<CycleResult>> {
        if self.store_configuration(config).await? {
            Ok(Some(self.evaluate(Trigger::UserConfigure).await))
        } else {
            Ok(None)
        }
    }

    /// Enable or disable auto-switching
    ///
    /// Enabling forces an evaluation. Disabling returns to Unlocked and drops
    /// every cooldown and pending retry.
    pub async fn set_enabled(&mut self, enabled: bool) -> Result<Option<CycleResult>> {
        self.store_enabled(enabled).await?;
        Ok(self.apply_enabled(enabled).await)
    }

    /// Handle a link event
    ///
    /// Events for adapters other than the configured target are ignored.
    /// Returns the cycle result when a stable link-up triggered evaluation.
    pub async fn handle_link_event(&mut self, event: LinkEvent) -> Option<CycleResult> {
        let target = match self.store.config() {
            Some(config) => config.target_adapter_name.clone(),
            None => {
                debug!("Not configured, ignoring {:?}", event);
                return None;
            }
        };
        if event.adapter() != target {
            debug!("Ignoring link event for non-target adapter {}", event.adapter());
            return None;
        }

        match event {
            LinkEvent::LinkDown { .. } => {
                info!("Link down on {}, unlocking", target);
                self.runtime.last_link_up = Some(false);
                self.runtime.reset();
                self.emit_event(EngineEvent::Unlocked {
                    reason: UnlockReason::LinkDown,
                });
                None
            }
            LinkEvent::StableLinkUp { .. } => {
                if self.runtime.last_link_up != Some(true) {
                    // link not seen up before: a fresh connection
                    info!("Fresh connection on {}, clearing cooldowns", target);
                    self.runtime.reset();
                } else {
                    debug!("Stable link-up on {}", target);
                }
                self.runtime.last_link_up = Some(true);
                self.runtime.last_link_up_event_at = Some(Instant::now());
                Some(self.evaluate(Trigger::StableLinkUp).await)
            }
        }
    }

    /// Run one evaluation cycle if `trigger` is admitted
    pub async fn evaluate(&mut self, trigger: Trigger) -> CycleResult {
        let now = Instant::now();
        let config = match self.admit(trigger, now) {
            Ok(config) => config,
            Err(reason) => {
                debug!("Skipping {:?} evaluation: {:?}", trigger, reason);
                self.emit_event(EngineEvent::CycleSkipped { trigger, reason });
                return CycleResult::Skipped(reason);
            }
        };

        self.runtime.retry_at = None;
        self.runtime.state = EngineState::Probing;
        self.emit_event(EngineEvent::CycleStarted { trigger });

        let outcome = self.run_cycle(&config).await;
        self.finish_cycle(config, trigger, outcome).await
    }

    /// Run the engine
    ///
    /// Watches `links`, serves [`EngineHandle`] commands and fires retries
    /// until Ctrl-C.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Fatal error
    pub async fn run(&mut self, links: &dyn LinkSource) -> Result<()> {
        self.run_internal(links, None).await
    }

    /// Run the engine until `shutdown_rx` fires
    ///
    /// Intended for tests and embedders that manage their own shutdown.
    /// With `None` it behaves like [`DecisionEngine::run`].
    pub async fn run_with_shutdown(
        &mut self,
        links: &dyn LinkSource,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(links, shutdown_rx).await
    }

    async fn run_internal(
        &mut self,
        links: &dyn LinkSource,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        let mut commands = self
            .command_rx
            .take()
            .ok_or_else(|| Error::config("engine is already running"))?;

        self.emit_event(EngineEvent::Started {
            adapter: self.store.config().map(|c| c.target_adapter_name.clone()),
            enabled: self.is_enabled(),
        });

        let mut link_stream = links.watch();

        if self.is_enabled() {
            self.evaluate(Trigger::Startup).await;
        }

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for shutdown signal: {}", e);
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        loop {
            let retry_at = self.runtime.retry_at;

            tokio::select! {
                Some(event) = link_stream.next() => {
                    self.handle_link_event(event).await;
                }

                Some(cmd) = commands.recv() => {
                    self.handle_command(cmd).await;
                }

                _ = retry_sleep(retry_at) => {
                    self.runtime.retry_at = None;
                    self.evaluate(Trigger::Retry).await;
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(EngineEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }

        self.command_rx = Some(commands);

        self.store.flush().await?;
        info!("Configuration flushed, engine stopped");

        Ok(())
    }

    async fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::Configure { config, reply } => {
                let result = self.store_configuration(config).await;
                let evaluate = matches!(result, Ok(true));
                let _ = reply.send(result.map(|_| ()));
                if evaluate {
                    self.evaluate(Trigger::UserConfigure).await;
                }
            }
            EngineCommand::GetConfig { reply } => {
                let _ = reply.send(self.store.config().cloned());
            }
            EngineCommand::SetEnabled { enabled, reply } => match self.store_enabled(enabled).await {
                Ok(()) => {
                    let _ = reply.send(Ok(()));
                    self.apply_enabled(enabled).await;
                }
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            },
            EngineCommand::LinkEvent { event, reply } => {
                self.handle_link_event(event).await;
                let _ = reply.send(());
            }
        }
    }

    /// Persist a configuration; returns whether it is enabled
    async fn store_configuration(&mut self, config: AutoSwitchConfig) -> Result<bool> {
        let saved = self.store.configure(config).await?;
        self.runtime.reset();
        self.enabled.store(saved.enabled, Ordering::SeqCst);
        info!(
            "Auto-switch configured for {} (enabled: {}, active: {})",
            saved.target_adapter_name, saved.enabled, saved.active_profile
        );
        self.emit_event(EngineEvent::ConfigChanged {
            enabled: saved.enabled,
        });
        Ok(saved.enabled)
    }

    async fn store_enabled(&mut self, enabled: bool) -> Result<()> {
        if let Err(e) = self.store.set_enabled(enabled).await {
            // a handle may already have flipped the shared flag
            let stored = self.store.config().is_some_and(|c| c.enabled);
            self.enabled.store(stored, Ordering::SeqCst);
            return Err(e);
        }
        self.enabled.store(enabled, Ordering::SeqCst);
        self.emit_event(EngineEvent::ConfigChanged { enabled });
        Ok(())
    }

    async fn apply_enabled(&mut self, enabled: bool) -> Option<CycleResult> {
        if enabled {
            info!("Auto-switch enabled");
            Some(self.evaluate(Trigger::Enabled).await)
        } else {
            info!("Auto-switch disabled");
            self.runtime.reset();
            self.emit_event(EngineEvent::Unlocked {
                reason: UnlockReason::Disabled,
            });
            None
        }
    }

    /// Admit a cycle, passing the cooldown gates unless `trigger` is forced
    fn admit(
        &mut self,
        trigger: Trigger,
        now: Instant,
    ) -> std::result::Result<AutoSwitchConfig, SkipReason> {
        if !self.is_enabled() {
            return Err(SkipReason::Disabled);
        }
        let config = self.store.config().cloned().ok_or(SkipReason::NotConfigured)?;
        if self.runtime.probe_in_flight() {
            return Err(SkipReason::ProbeInFlight);
        }
        if trigger.is_forced() {
            self.runtime.gates.min_interval.arm(now);
        } else {
            if self.runtime.is_locked() {
                return Err(SkipReason::Locked);
            }
            self.runtime.gates.try_enter(now)?;
        }
        Ok(config)
    }

    async fn run_cycle(&mut self, config: &AutoSwitchConfig) -> CycleOutcome {
        let adapter = config.target_adapter_name.as_str();

        // 1. hard-lease guard
        match self.snapshots.snapshot(adapter).await {
            Ok(Some(snapshot)) if snapshot.classification.is_ignored() => {
                debug!(
                    "Target adapter {} is classified {:?}, ignoring",
                    adapter, snapshot.classification
                );
                return CycleOutcome::Ignored;
            }
            Ok(Some(snapshot)) if !snapshot.is_enabled => {
                debug!("{} has no link, not evaluating", adapter);
                return CycleOutcome::NoLink;
            }
            Ok(Some(snapshot)) => {
                self.runtime.last_link_up = Some(true);
                if snapshot.has_valid_lease() {
                    if let Some(dhcp) = config.dhcp_profile() {
                        info!(
                            "{} holds DHCP lease {}, locking {} without probing",
                            adapter, snapshot.ip_address, dhcp
                        );
                        self.runtime.consecutive_failures = 0;
                        let decision = if dhcp == config.active_profile {
                            Decision::stay(dhcp, None)
                        } else {
                            Decision::switched(dhcp, None)
                        };
                        return CycleOutcome::Accepted {
                            decision,
                            reason: LockReason::HardLease,
                        };
                    }
                }
            }
            Ok(None) => debug!("Target adapter {} not present in snapshot", adapter),
            Err(e) => warn!("Failed to read snapshot of {}: {}", adapter, e),
        }

        // 2. directional guard
        let active = config.active();
        if self.settings.directional_guard && active.is_dhcp() && !config.inactive().is_dhcp() {
            debug!(
                "{} is DHCP and {} is static, staying",
                active.id,
                config.inactive().id
            );
            return CycleOutcome::Accepted {
                decision: Decision::stay(config.active_profile, None),
                reason: LockReason::DirectionalGuard,
            };
        }

        // 3. reachability
        let target = active.ping_target.clone();
        let reachable = probe_with_retries(
            self.probe.as_ref(),
            &target,
            self.settings.probe_timeout(),
            self.settings.probe_attempts,
            self.settings.probe_retry_delay(),
        )
        .await;

        if reachable {
            self.runtime.consecutive_failures = 0;
            return CycleOutcome::Accepted {
                decision: Decision::stay(config.active_profile, Some(target)),
                reason: LockReason::Reachable,
            };
        }

        self.runtime.consecutive_failures = self.runtime.consecutive_failures.saturating_add(1);
        let failures = self.runtime.consecutive_failures;
        if failures < self.settings.failure_threshold {
            return CycleOutcome::BelowThreshold { target, failures };
        }

        let result = match self.select_executor() {
            Some(executor) => {
                info!(
                    "{} unreachable {} times, consulting {} executor",
                    target,
                    failures,
                    executor.name()
                );
                executor
                    .decide(
                        adapter,
                        config.active_profile,
                        &config.profile_a,
                        &config.profile_b,
                    )
                    .await
            }
            None => Err(Error::executor("none", "no switch executor is available")),
        };

        match result {
            Ok(decision) if decision.outcome == SwitchOutcome::BothFailed => {
                CycleOutcome::BothFailed(decision)
            }
            Ok(decision) => {
                self.runtime.consecutive_failures = 0;
                CycleOutcome::Accepted {
                    decision,
                    reason: LockReason::Executor,
                }
            }
            Err(e) => CycleOutcome::ExecutorFailed(e),
        }
    }

    async fn finish_cycle(
        &mut self,
        config: AutoSwitchConfig,
        trigger: Trigger,
        outcome: CycleOutcome,
    ) -> CycleResult {
        if !self.is_enabled() {
            info!("Auto-switch disabled during evaluation, discarding outcome");
            self.runtime.reset();
            self.emit_event(EngineEvent::Unlocked {
                reason: UnlockReason::Disabled,
            });
            return CycleResult::Discarded;
        }

        let now = Instant::now();
        match outcome {
            CycleOutcome::Ignored => {
                self.runtime.state = EngineState::Unlocked;
                let reason = SkipReason::IgnoredAdapter;
                self.emit_event(EngineEvent::CycleSkipped { trigger, reason });
                CycleResult::Skipped(reason)
            }

            CycleOutcome::NoLink => {
                self.runtime.state = EngineState::Unlocked;
                self.runtime.last_link_up = Some(false);
                let reason = SkipReason::LinkDown;
                self.emit_event(EngineEvent::CycleSkipped { trigger, reason });
                CycleResult::Skipped(reason)
            }

            CycleOutcome::Accepted { decision, reason } => {
                let previous = config.active_profile;
                let active = decision.active_profile;
                let updated = config.with_active(active);

                if let Err(e) = self.store.save(updated.clone()).await {
                    warn!("Failed to persist active profile {}: {}", active, e);
                }

                if active != previous {
                    info!(
                        "Switched {} -> {} on {}",
                        previous, active, updated.target_adapter_name
                    );
                    self.runtime.gates.post_switch.arm(now);
                    self.emit_event(EngineEvent::Switched {
                        from: previous,
                        to: active,
                    });
                }

                self.runtime.state = EngineState::Locked;
                info!("Locked {} ({:?})", active, reason);
                self.emit_event(EngineEvent::Locked { active, reason });

                let color = self.indicator.select_color(
                    decision.outcome,
                    decision.actively_probed_target.as_deref(),
                    &updated,
                );
                self.show_indicator(color).await;

                CycleResult::Locked { active, reason }
            }

            CycleOutcome::BelowThreshold { target, failures } => {
                warn!(
                    "{} unreachable ({}/{}), not switching yet",
                    target, failures, self.settings.failure_threshold
                );
                self.runtime.state = EngineState::Unlocked;
                self.schedule_retry(now);
                self.emit_event(EngineEvent::ProbeFailed {
                    target,
                    consecutive_failures: failures,
                });
                CycleResult::Retrying { failures }
            }

            CycleOutcome::BothFailed(decision) => {
                warn!(
                    "Both profiles unreachable on {}, kept {}",
                    config.target_adapter_name, decision.active_profile
                );
                self.runtime.gates.post_failure.arm(now);
                self.runtime.state = EngineState::Unlocked;
                self.emit_event(EngineEvent::BothFailed {
                    active: decision.active_profile,
                });

                let color = self
                    .indicator
                    .select_color(SwitchOutcome::BothFailed, None, &config);
                self.show_indicator(color).await;

                CycleResult::BothFailed
            }

            CycleOutcome::ExecutorFailed(e) => {
                error!("Switch executor failed: {}", e);
                self.runtime.state = EngineState::Unlocked;
                self.schedule_retry(now);
                self.emit_event(EngineEvent::ExecutorFailed {
                    error: e.to_string(),
                });
                CycleResult::ExecutorFailed
            }
        }
    }

    fn select_executor(&self) -> Option<&dyn SwitchExecutor> {
        if self.executor.is_available() {
            return Some(self.executor.as_ref());
        }
        match self.fallback.as_deref() {
            Some(fallback) if fallback.is_available() => {
                debug!(
                    "{} executor unavailable, using {}",
                    self.executor.name(),
                    fallback.name()
                );
                Some(fallback)
            }
            _ => None,
        }
    }

    fn schedule_retry(&mut self, now: Instant) {
        if let Some(delay) = self.settings.retry_delay() {
            self.runtime.retry_at = Some(now + delay);
        }
    }

    async fn show_indicator(&self, color: String) {
        if self.indicator.apply(&color).await {
            self.emit_event(EngineEvent::IndicatorApplied { color });
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // Send event, logging warning if channel is full (backpressure)
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                trace!("Event receiver dropped");
            }
        }
    }
}

async fn retry_sleep(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}
