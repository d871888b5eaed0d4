//! Test doubles and common utilities for controller contract tests
//!
//! Every double counts its calls through shared `Arc` counters so a copy
//! can be handed to the engine while the test keeps one to inspect.

#![allow(dead_code)]

use async_trait::async_trait;
use netswitch_core::config::EngineConfig;
use netswitch_core::engine::{DecisionEngine, EngineEvent};
use netswitch_core::error::{Error, Result};
use netswitch_core::profile::{AutoSwitchConfig, NetworkProfile, ProfileId, StaticConfig};
use netswitch_core::state::{AUTO_SWITCH_CONFIG_KEY, MemoryConfigStore, ProfileStore};
use netswitch_core::traits::{
    AdapterClass, AdapterSnapshot, ConfigStore, Decision, IndicatorSink, LinkEvent, LinkSource,
    ReachabilityProbe, SnapshotSource, SwitchExecutor,
};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::Stream;

/// A link source that emits events on demand
pub struct ControlledLinkSource {
    engine_rx: Mutex<Option<mpsc::UnboundedReceiver<LinkEvent>>>,
}

impl ControlledLinkSource {
    pub fn new() -> (Self, mpsc::UnboundedSender<LinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                engine_rx: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

impl LinkSource for ControlledLinkSource {
    fn watch(&self) -> Pin<Box<dyn Stream<Item = LinkEvent> + Send + 'static>> {
        let rx = self
            .engine_rx
            .lock()
            .unwrap()
            .take()
            .expect("watch() can only be called once");
        Box::pin(tokio_stream::wrappers::UnboundedReceiverStream::new(rx))
    }
}

/// A probe whose answer the test controls
pub struct ScriptedProbe {
    reachable: AtomicBool,
    calls: AtomicUsize,
    hosts: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    pub fn new(reachable: bool) -> Arc<Self> {
        Arc::new(Self {
            reachable: AtomicBool::new(reachable),
            calls: AtomicUsize::new(0),
            hosts: Mutex::new(Vec::new()),
        })
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Hosts probed, in order
    pub fn hosts(&self) -> Vec<String> {
        self.hosts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReachabilityProbe for ScriptedProbe {
    async fn probe(&self, host: &str, _timeout: Duration) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.hosts.lock().unwrap().push(host.to_string());
        self.reachable.load(Ordering::SeqCst)
    }
}

/// Snapshot source returning whatever the test last set
pub struct ScriptedSnapshotSource {
    snapshots: Mutex<Vec<AdapterSnapshot>>,
}

impl ScriptedSnapshotSource {
    pub fn new(snapshot: AdapterSnapshot) -> Arc<Self> {
        Arc::new(Self {
            snapshots: Mutex::new(vec![snapshot]),
        })
    }

    pub fn set(&self, snapshot: AdapterSnapshot) {
        *self.snapshots.lock().unwrap() = vec![snapshot];
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSnapshotSource {
    async fn snapshots(&self) -> Result<Vec<AdapterSnapshot>> {
        Ok(self.snapshots.lock().unwrap().clone())
    }
}

/// A mock SwitchExecutor that tracks calls
pub struct MockExecutor {
    calls: Arc<AtomicUsize>,
    response: Arc<Mutex<std::result::Result<Decision, String>>>,
    available: bool,
    pub name: &'static str,
}

impl MockExecutor {
    /// Executor answering every call with `decision`
    pub fn returning(decision: Decision) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            response: Arc::new(Mutex::new(Ok(decision))),
            available: true,
            name: "mock",
        }
    }

    /// Executor failing every call
    pub fn failing(message: &str) -> Self {
        Self {
            response: Arc::new(Mutex::new(Err(message.to_string()))),
            ..Self::returning(Decision::stay(ProfileId::ProfileA, None))
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Change the answer for subsequent calls
    pub fn respond_with(&self, decision: Decision) {
        *self.response.lock().unwrap() = Ok(decision);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Create a new MockExecutor that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            calls: Arc::clone(&other.calls),
            response: Arc::clone(&other.response),
            available: other.available,
            name: other.name,
        }
    }
}

#[async_trait]
impl SwitchExecutor for MockExecutor {
    async fn decide(
        &self,
        _adapter_name: &str,
        _current_active: ProfileId,
        _profile_a: &NetworkProfile,
        _profile_b: &NetworkProfile,
    ) -> Result<Decision> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response
            .lock()
            .unwrap()
            .clone()
            .map_err(|message| Error::executor(self.name, message))
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

/// Indicator sink recording every color it is asked to show
#[derive(Clone, Default)]
pub struct RecordingIndicator {
    colors: Arc<Mutex<Vec<String>>>,
}

impl RecordingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn colors(&self) -> Vec<String> {
        self.colors.lock().unwrap().clone()
    }
}

#[async_trait]
impl IndicatorSink for RecordingIndicator {
    async fn set_indicator_color(&self, hex_color: &str) -> Result<()> {
        self.colors.lock().unwrap().push(hex_color.to_string());
        Ok(())
    }
}

/// The adapter used throughout the scenarios: link up, no valid lease
pub fn ethernet_without_lease() -> AdapterSnapshot {
    AdapterSnapshot::new("Ethernet", AdapterClass::Ethernet)
        .with_link(true)
        .with_dhcp_lease("169.254.3.4", "")
}

/// Profile A: DHCP towards 1.1.1.1, green
pub fn dhcp_profile_a() -> NetworkProfile {
    NetworkProfile::dhcp(ProfileId::ProfileA, "1.1.1.1").with_color("#00FF00")
}

/// Profile B: static 172.16.1.55/24 towards its gateway, orange
pub fn static_profile_b() -> NetworkProfile {
    NetworkProfile::with_static(
        ProfileId::ProfileB,
        StaticConfig {
            ip: "172.16.1.55".to_string(),
            subnet: "255.255.255.0".to_string(),
            gateway: "172.16.1.254".to_string(),
            dns: Vec::new(),
        },
        "172.16.1.254",
    )
    .with_color("#FFA500")
}

/// Enabled configuration on "Ethernet", profile A active
pub fn scenario_config() -> AutoSwitchConfig {
    AutoSwitchConfig::new("Ethernet", dhcp_profile_a(), static_profile_b())
}

/// Default settings with the directional guard off
pub fn reachability_settings() -> EngineConfig {
    EngineConfig {
        directional_guard: false,
        ..EngineConfig::default()
    }
}

/// An engine plus the doubles wired into it
pub struct Harness {
    pub engine: DecisionEngine,
    pub events: mpsc::Receiver<EngineEvent>,
    pub probe: Arc<ScriptedProbe>,
    pub executor: MockExecutor,
    pub indicator: RecordingIndicator,
    pub snapshots: Arc<ScriptedSnapshotSource>,
    pub backend: MemoryConfigStore,
}

impl Harness {
    /// Build an engine whose store already holds `config`
    pub async fn new(
        config: Option<AutoSwitchConfig>,
        settings: EngineConfig,
        executor: MockExecutor,
        snapshot: AdapterSnapshot,
        probe_reachable: bool,
    ) -> Self {
        let backend = match config {
            Some(config) => MemoryConfigStore::with_value(
                AUTO_SWITCH_CONFIG_KEY,
                serde_json::to_value(&config).unwrap(),
            ),
            None => MemoryConfigStore::new(),
        };
        let store = ProfileStore::open(Box::new(backend.clone())).await.unwrap();

        let probe = ScriptedProbe::new(probe_reachable);
        let snapshots = ScriptedSnapshotSource::new(snapshot);
        let indicator = RecordingIndicator::new();

        let (engine, events) = DecisionEngine::new(
            snapshots.clone(),
            probe.clone(),
            Box::new(MockExecutor::sharing_counters_with(&executor)),
            Box::new(indicator.clone()),
            store,
            settings,
        )
        .expect("engine construction succeeds");

        Self {
            engine,
            events,
            probe,
            executor,
            indicator,
            snapshots,
            backend,
        }
    }

    /// The configuration as currently persisted
    pub async fn persisted(&self) -> serde_json::Value {
        self.backend
            .get(AUTO_SWITCH_CONFIG_KEY)
            .await
            .unwrap()
            .expect("configuration persisted")
    }

    /// Drain every event emitted so far
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}
