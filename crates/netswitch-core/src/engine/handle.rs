//! Cloneable handle to a running `DecisionEngine`
//!
//! UI layers, tray menus and the daemon talk to the engine task through
//! this handle. Every call is a command with a oneshot reply.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};
use crate::profile::AutoSwitchConfig;
use crate::traits::LinkEvent;

/// Commands accepted by the engine task
#[derive(Debug)]
pub(crate) enum EngineCommand {
    Configure {
        config: AutoSwitchConfig,
        reply: oneshot::Sender<Result<()>>,
    },
    GetConfig {
        reply: oneshot::Sender<Option<AutoSwitchConfig>>,
    },
    SetEnabled {
        enabled: bool,
        reply: oneshot::Sender<Result<()>>,
    },
    LinkEvent {
        event: LinkEvent,
        reply: oneshot::Sender<()>,
    },
}

/// Handle for controlling a running engine
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
    enabled: Arc<AtomicBool>,
}

impl EngineHandle {
    pub(crate) fn new(tx: mpsc::Sender<EngineCommand>, enabled: Arc<AtomicBool>) -> Self {
        Self { tx, enabled }
    }

    /// Validate and persist a configuration
    ///
    /// Returns once the configuration is stored (or rejected). When it is
    /// enabled, the engine then runs a forced evaluation.
    pub async fn configure(&self, config: AutoSwitchConfig) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Configure { config, reply }).await?;
        rx.await.map_err(|_| Error::ChannelClosed)?
    }

    /// Current configuration, `None` if never configured
    pub async fn config(&self) -> Result<Option<AutoSwitchConfig>> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::GetConfig { reply }).await?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }

    /// Enable or disable auto-switching
    ///
    /// The flag flips immediately so that an evaluation already in flight
    /// discards its side effects.
    pub async fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.enabled.store(enabled, Ordering::SeqCst);
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::SetEnabled { enabled, reply }).await?;
        rx.await.map_err(|_| Error::ChannelClosed)?
    }

    /// Deliver a link event from an external watcher
    ///
    /// Resolves once the engine has handled the event.
    pub async fn link_event(&self, event: LinkEvent) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::LinkEvent { event, reply }).await?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }

    /// Whether auto-switching is currently enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn send(&self, cmd: EngineCommand) -> Result<()> {
        self.tx.send(cmd).await.map_err(|_| Error::ChannelClosed)
    }
}
