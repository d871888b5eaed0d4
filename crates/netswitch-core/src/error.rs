//! Error types for the auto-switch controller
//!
//! Only [`Error::ConfigInvalid`] is meant to reach a user (it is returned
//! synchronously from an explicit save). Everything raised inside the
//! autonomous loop is logged and recovered by the engine.

use thiserror::Error;

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the controller
#[derive(Error, Debug)]
pub enum Error {
    /// User-supplied auto-switch configuration was rejected
    #[error("Invalid auto-switch configuration: {0}")]
    ConfigInvalid(String),

    /// Engine or watcher settings are unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// The switch-decision executor failed
    #[error("Executor error ({executor}): {message}")]
    Executor {
        /// Executor name
        executor: String,
        /// Error message
        message: String,
    },

    /// Applying a profile to the operating system failed
    #[error("Applier error: {0}")]
    Applier(String),

    /// Setting the indicator color failed
    #[error("Indicator error: {0}")]
    Indicator(String),

    /// Reading adapter snapshots failed
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Persistence backend errors
    #[error("Store error: {0}")]
    Store(String),

    /// The engine task is gone
    #[error("Engine channel closed")]
    ChannelClosed,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a user-facing configuration validation error
    pub fn config_invalid(msg: impl Into<String>) -> Self {
        Self::ConfigInvalid(msg.into())
    }

    /// Create a settings error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an executor error
    pub fn executor(executor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Executor {
            executor: executor.into(),
            message: message.into(),
        }
    }

    /// Create an applier error
    pub fn applier(msg: impl Into<String>) -> Self {
        Self::Applier(msg.into())
    }

    /// Create an indicator error
    pub fn indicator(msg: impl Into<String>) -> Self {
        Self::Indicator(msg.into())
    }

    /// Create a snapshot error
    pub fn snapshot(msg: impl Into<String>) -> Self {
        Self::Snapshot(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Whether this error should be shown to the user
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::ConfigInvalid(_))
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_validation_errors_are_user_facing() {
        assert!(Error::config_invalid("adapter name is required").is_user_facing());
        assert!(!Error::executor("probe-driven", "timeout").is_user_facing());
        assert!(!Error::indicator("tray gone").is_user_facing());
    }

    #[test]
    fn executor_error_names_the_executor() {
        let err = Error::executor("direct-toggle", "nmcli exited with 8");
        assert_eq!(
            err.to_string(),
            "Executor error (direct-toggle): nmcli exited with 8"
        );
    }
}
