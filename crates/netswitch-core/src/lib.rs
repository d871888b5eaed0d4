// # netswitch-core
//
// Core library for the dual-profile network auto-switch controller.
//
// ## Architecture Overview
//
// One adapter, two profiles (typically an outward DHCP profile and an
// inward static profile). The controller watches the adapter's link and
// reachability and picks a profile without flapping between them:
// - **LinkWatcher**: debounced link-up / immediate link-down from snapshots
// - **DecisionEngine**: UNLOCKED / PROBING / LOCKED state machine with
//   hard-lease guard, directional guard, hysteresis and cooldowns
// - **SwitchExecutor**: applies and tests profiles (probe-driven or direct toggle)
// - **IndicatorController**: maps outcomes to an indicator color
// - **ProfileStore**: validated, normalised persistence with legacy migration
//
// ## Design Principles
//
// 1. **Separation of Concerns**: decisions are separate from OS application
// 2. **Event-Driven**: link changes arrive as async streams
// 3. **Library-First**: the engine can be embedded and driven directly
// 4. **Recover Locally**: only configuration validation errors reach the user

pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod indicator;
pub mod normalize;
pub mod profile;
pub mod state;
pub mod traits;
pub mod watcher;

// Re-export core types for convenience
pub use config::{EngineConfig, WatcherConfig};
pub use engine::{
    CycleResult, DecisionEngine, EngineEvent, EngineHandle, EngineState, LockReason, SkipReason,
    Trigger,
};
pub use error::{Error, Result};
pub use executor::{DirectToggleExecutor, ProbeDrivenExecutor};
pub use indicator::IndicatorController;
pub use profile::{AutoSwitchConfig, NetworkProfile, ProfileId, ProfileMode, StaticConfig};
pub use state::{FileConfigStore, MemoryConfigStore, ProfileStore};
pub use traits::{
    ConfigApplier, ConfigStore, IndicatorSink, LinkEvent, LinkSource, ReachabilityProbe,
    SnapshotSource, SwitchExecutor,
};
pub use watcher::LinkWatcher;
