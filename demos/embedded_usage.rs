//! Minimal embedding example for netswitch-core
//!
//! A simulated adapter is moved between an inward network (static
//! addressing, no DHCP server) and an outward one (DHCP). The application
//! owns the engine lifecycle and drives it through an `EngineHandle`.

use async_trait::async_trait;
use netswitch_core::profile::{AutoSwitchConfig, NetworkProfile, ProfileId, StaticConfig};
use netswitch_core::traits::{AdapterClass, AdapterSnapshot};
use netswitch_core::{
    ConfigApplier, DecisionEngine, EngineConfig, IndicatorSink, LinkEvent, LinkSource,
    MemoryConfigStore, ProbeDrivenExecutor, ProfileStore, ReachabilityProbe, Result,
    SnapshotSource,
};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::Stream;

const ADAPTER: &str = "Ethernet";
const OUTWARD_TARGET: &str = "8.8.8.8";
const OUTWARD_GATEWAY: &str = "192.168.1.1";
const INWARD_TARGET: &str = "172.16.1.254";

/// Which network the cable is plugged into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Network {
    Inward,
    Outward,
}

struct LabState {
    network: Network,
    adapter: AdapterSnapshot,
}

/// One adapter on a switchable network
///
/// Serves as snapshot source, applier and probe at once.
#[derive(Clone)]
struct SimulatedLab {
    state: Arc<Mutex<LabState>>,
}

impl SimulatedLab {
    fn new() -> Self {
        let adapter = AdapterSnapshot::new(ADAPTER, AdapterClass::Ethernet)
            .with_link(true)
            .with_static_address("172.16.1.55", INWARD_TARGET);
        Self {
            state: Arc::new(Mutex::new(LabState {
                network: Network::Inward,
                adapter,
            })),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut LabState) -> T) -> T {
        match self.state.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn move_cable(&self, network: Network) {
        println!("[Lab] Cable moved to the {:?} network", network);
        self.with_state(|s| s.network = network);
    }
}

#[async_trait]
impl SnapshotSource for SimulatedLab {
    async fn snapshots(&self) -> Result<Vec<AdapterSnapshot>> {
        Ok(vec![self.with_state(|s| s.adapter.clone())])
    }
}

#[async_trait]
impl ConfigApplier for SimulatedLab {
    async fn apply_dhcp(&self, adapter_name: &str) -> Result<()> {
        println!("[Lab] {} -> DHCP", adapter_name);
        self.with_state(|s| {
            s.adapter = match s.network {
                Network::Outward => s
                    .adapter
                    .clone()
                    .with_dhcp_lease("192.168.1.23", OUTWARD_GATEWAY),
                Network::Inward => s.adapter.clone().with_dhcp_lease("169.254.10.7", ""),
            };
        });
        Ok(())
    }

    async fn apply_static(&self, adapter_name: &str, config: &StaticConfig) -> Result<()> {
        println!("[Lab] {} -> static {}", adapter_name, config.ip);
        self.with_state(|s| {
            s.adapter = s
                .adapter
                .clone()
                .with_static_address(config.ip.clone(), config.gateway.clone());
        });
        Ok(())
    }

    async fn set_dns(&self, adapter_name: &str, dns: &[String]) -> Result<()> {
        println!("[Lab] {} DNS -> {:?}", adapter_name, dns);
        Ok(())
    }
}

#[async_trait]
impl ReachabilityProbe for SimulatedLab {
    async fn probe(&self, host: &str, _timeout: Duration) -> bool {
        self.with_state(|s| match (s.network, host) {
            (Network::Outward, OUTWARD_TARGET | OUTWARD_GATEWAY) => s.adapter.has_valid_lease(),
            (Network::Inward, INWARD_TARGET) => !s.adapter.is_dhcp,
            _ => false,
        })
    }
}

/// Indicator printing to stdout
struct ConsoleIndicator;

#[async_trait]
impl IndicatorSink for ConsoleIndicator {
    async fn set_indicator_color(&self, hex_color: &str) -> Result<()> {
        println!("[Indicator] {}", hex_color);
        Ok(())
    }
}

/// Link source fed by the application
struct ChannelLinkSource {
    rx: Mutex<Option<mpsc::UnboundedReceiver<LinkEvent>>>,
}

impl LinkSource for ChannelLinkSource {
    fn watch(&self) -> Pin<Box<dyn Stream<Item = LinkEvent> + Send + 'static>> {
        let rx = match self.rx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match rx {
            Some(rx) => Box::pin(tokio_stream::wrappers::UnboundedReceiverStream::new(rx)),
            None => Box::pin(tokio_stream::empty()),
        }
    }
}

fn lab_config() -> AutoSwitchConfig {
    let outward = NetworkProfile::dhcp(ProfileId::ProfileA, OUTWARD_TARGET).with_color("#00FF00");
    let inward = NetworkProfile::with_static(
        ProfileId::ProfileB,
        StaticConfig {
            ip: "172.16.1.55".to_string(),
            subnet: "255.255.255.0".to_string(),
            gateway: INWARD_TARGET.to_string(),
            dns: vec!["172.16.1.6".to_string()],
        },
        INWARD_TARGET,
    )
    .with_color("#FFA500");
    AutoSwitchConfig::new(ADAPTER, outward, inward).with_active(ProfileId::ProfileB)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::WARN).init();

    println!("=== Embedded netswitch-core Example ===\n");

    let lab = SimulatedLab::new();
    let snapshots: Arc<dyn SnapshotSource> = Arc::new(lab.clone());
    let probe: Arc<dyn ReachabilityProbe> = Arc::new(lab.clone());
    let executor = ProbeDrivenExecutor::new(
        Arc::new(lab.clone()),
        Arc::clone(&probe),
        Arc::clone(&snapshots),
    );

    let settings = EngineConfig {
        failure_threshold: 1,
        ..EngineConfig::default()
    };

    println!("1. Creating engine...");
    let store = ProfileStore::open(Box::new(MemoryConfigStore::new())).await?;
    let (mut engine, mut event_rx) = DecisionEngine::new(
        snapshots,
        probe,
        Box::new(executor),
        Box::new(ConsoleIndicator),
        store,
        settings,
    )?;
    let handle = engine.handle();

    let event_listener = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            println!("[Event] {:?}", event);
        }
    });

    println!("2. Starting engine in background...");
    let (link_tx, link_rx) = mpsc::unbounded_channel();
    let links = ChannelLinkSource {
        rx: Mutex::new(Some(link_rx)),
    };
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let engine_task =
        tokio::spawn(async move { engine.run_with_shutdown(&links, Some(shutdown_rx)).await });

    println!("3. Configuring: inward static profile active...");
    handle.configure(lab_config()).await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    println!("\n4. Replugging into the outward network...");
    let _ = link_tx.send(LinkEvent::down(ADAPTER));
    lab.move_cable(Network::Outward);
    let _ = link_tx.send(LinkEvent::stable_up(ADAPTER));
    tokio::time::sleep(Duration::from_secs(2)).await;

    if let Some(config) = handle.config().await? {
        println!("\n   Active profile is now {}", config.active_profile);
    }

    println!("\n5. Disabling and stopping...");
    handle.set_enabled(false).await?;
    let _ = shutdown_tx.send(());
    match engine_task.await {
        Ok(result) => result?,
        Err(e) => println!("Engine task failed: {}", e),
    }
    drop(handle);
    let _ = tokio::time::timeout(Duration::from_millis(100), event_listener).await;

    println!("\n=== Embedding Successful ===");
    Ok(())
}
