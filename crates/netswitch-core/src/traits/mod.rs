//! Core traits for the auto-switch controller
//!
//! These are the seams to everything outside the decision logic:
//!
//! - [`SnapshotSource`]: read classified adapter snapshots
//! - [`LinkSource`]: stream of debounced link transitions
//! - [`ReachabilityProbe`]: one ping-style reachability test
//! - [`SwitchExecutor`]: stay/switch decision plus OS application
//! - [`ConfigApplier`]: raw DHCP/static/DNS application
//! - [`IndicatorSink`]: show an indicator color
//! - [`ConfigStore`]: keyed JSON persistence

pub mod config_applier;
pub mod config_store;
pub mod indicator_sink;
pub mod link_source;
pub mod probe;
pub mod snapshot_source;
pub mod switch_executor;

pub use config_applier::{ConfigApplier, apply_profile};
pub use config_store::{ConfigStore, StoredEntry};
pub use indicator_sink::IndicatorSink;
pub use link_source::{LinkEvent, LinkSource};
pub use probe::{ReachabilityProbe, probe_with_retries};
pub use snapshot_source::{AdapterClass, AdapterSnapshot, SnapshotSource};
pub use switch_executor::{Decision, SwitchExecutor, SwitchOutcome};
