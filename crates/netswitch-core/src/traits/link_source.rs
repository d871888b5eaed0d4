// # Link Source Trait
//
// Defines the interface for streams of debounced link transitions.
//
// ## Implementations
//
// - [`crate::watcher::LinkWatcher`]: polls a `SnapshotSource` and debounces link-up
// - Test doubles: channel-backed sources that emit on demand
//
// ## Usage
//
// ```rust,ignore
// use netswitch_core::LinkSource;
// use tokio_stream::StreamExt;
//
// let mut stream = source.watch();
// while let Some(event) = stream.next().await {
//     println!("{:?}", event);
// }
// ```

use std::pin::Pin;
use tokio_stream::Stream;

/// A link transition on one adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The link came up and stayed up past the debounce window
    StableLinkUp { adapter: String },
    /// The link went down (never debounced)
    LinkDown { adapter: String },
}

impl LinkEvent {
    pub fn stable_up(adapter: impl Into<String>) -> Self {
        Self::StableLinkUp {
            adapter: adapter.into(),
        }
    }

    pub fn down(adapter: impl Into<String>) -> Self {
        Self::LinkDown {
            adapter: adapter.into(),
        }
    }

    /// Adapter the event refers to
    pub fn adapter(&self) -> &str {
        match self {
            LinkEvent::StableLinkUp { adapter } | LinkEvent::LinkDown { adapter } => adapter,
        }
    }
}

/// Trait for link event sources
///
/// # Trust Level: Semi-Trusted
///
/// Link sources are **observers**, not decision-makers:
/// - ✅ Read adapter state and debounce link-up
/// - ✅ Spawn a single task that owns their timers
/// - ❌ Decide whether a profile should be evaluated (owned by `DecisionEngine`)
/// - ❌ Suppress repeated link-ups beyond one event per physical connect
///   (oscillation control is owned by `DecisionEngine`)
pub trait LinkSource: Send + Sync {
    /// Stream of link events
    ///
    /// Must be cancellation-safe: dropping the stream stops the watcher.
    fn watch(&self) -> Pin<Box<dyn Stream<Item = LinkEvent> + Send + 'static>>;
}
