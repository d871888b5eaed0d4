// # netswitchd - Network Auto-Switch Daemon
//
// This is a thin integration layer. All decision logic lives in
// netswitch-core; the daemon only:
// 1. Reads configuration from environment variables
// 2. Initializes tracing and the runtime
// 3. Wires the Linux collaborators into a `DecisionEngine`
// 4. Runs the engine until SIGTERM/SIGINT
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Storage
// - `NETSWITCH_STORE_PATH`: Store file (default `/var/lib/netswitch/config.json`)
// - `NETSWITCH_CONFIG_FILE`: Optional JSON auto-switch configuration applied
//   at startup (any stored shape is accepted)
//
// ### Switching
// - `NETSWITCH_STRATEGY`: `probe` (probe-driven, falls back to toggle) or `toggle`
// - `NETSWITCH_APPLIER`: `nmcli` or `dry-run`
// - `NETSWITCH_PING_INTERFACE`: Bind reachability probes to an interface
// - `NETSWITCH_FAILURE_THRESHOLD`: Failed cycles before switching (1-10)
// - `NETSWITCH_DIRECTIONAL_GUARD`: Never leave an active DHCP profile for a
//   static one (`true`/`false`)
//
// ### Link Watching
// - `NETSWITCH_POLL_INTERVAL_MS`: Snapshot interval (100-60000)
// - `NETSWITCH_DEBOUNCE_MS`: Stable link-up debounce (0-60000)
//
// ### Logging
// - `NETSWITCH_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export NETSWITCH_STORE_PATH=/var/lib/netswitch/config.json
// export NETSWITCH_CONFIG_FILE=/etc/netswitch/profiles.json
// export NETSWITCH_STRATEGY=probe
// export NETSWITCH_APPLIER=nmcli
//
// netswitchd
// ```

mod collaborators;

use anyhow::{Context, Result};
use collaborators::{DryRunApplier, LoggingIndicator};
use netswitch_core::engine::EngineEvent;
use netswitch_core::normalize::normalize;
use netswitch_core::traits::{ConfigApplier, ReachabilityProbe, SnapshotSource, SwitchExecutor};
use netswitch_core::{
    AutoSwitchConfig, DecisionEngine, DirectToggleExecutor, EngineConfig, FileConfigStore,
    LinkWatcher, ProbeDrivenExecutor, ProfileStore, WatcherConfig,
};
use netswitch_linux::{NmcliApplier, SysfsSnapshotSource};
use netswitch_probe_ping::PingProbe;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

const DEFAULT_STORE_PATH: &str = "/var/lib/netswitch/config.json";

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum NetswitchExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<NetswitchExitCode> for ExitCode {
    fn from(code: NetswitchExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
struct Config {
    store_path: String,
    config_file: Option<String>,
    strategy: String,
    applier: String,
    ping_interface: Option<String>,
    poll_interval_ms: u64,
    debounce_ms: u64,
    failure_threshold: u32,
    directional_guard: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let engine_defaults = EngineConfig::default();
        let watcher_defaults = WatcherConfig::default();

        Ok(Self {
            store_path: get("NETSWITCH_STORE_PATH")
                .unwrap_or_else(|| DEFAULT_STORE_PATH.to_string()),
            config_file: get("NETSWITCH_CONFIG_FILE"),
            strategy: get("NETSWITCH_STRATEGY").unwrap_or_else(|| "probe".to_string()),
            applier: get("NETSWITCH_APPLIER").unwrap_or_else(|| "nmcli".to_string()),
            ping_interface: get("NETSWITCH_PING_INTERFACE"),
            poll_interval_ms: parse_var(
                "NETSWITCH_POLL_INTERVAL_MS",
                get("NETSWITCH_POLL_INTERVAL_MS"),
                watcher_defaults.poll_interval_ms,
            )?,
            debounce_ms: parse_var(
                "NETSWITCH_DEBOUNCE_MS",
                get("NETSWITCH_DEBOUNCE_MS"),
                watcher_defaults.debounce_ms,
            )?,
            failure_threshold: parse_var(
                "NETSWITCH_FAILURE_THRESHOLD",
                get("NETSWITCH_FAILURE_THRESHOLD"),
                engine_defaults.failure_threshold,
            )?,
            directional_guard: match get("NETSWITCH_DIRECTIONAL_GUARD") {
                Some(raw) => parse_bool(&raw).with_context(|| {
                    format!("NETSWITCH_DIRECTIONAL_GUARD must be true or false. Got: {}", raw)
                })?,
                None => engine_defaults.directional_guard,
            },
            log_level: get("NETSWITCH_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.store_path.is_empty() {
            anyhow::bail!("NETSWITCH_STORE_PATH cannot be empty");
        }

        match self.strategy.as_str() {
            "probe" | "toggle" => {}
            _ => anyhow::bail!(
                "NETSWITCH_STRATEGY '{}' is not supported. \
                Supported strategies: probe, toggle",
                self.strategy
            ),
        }

        match self.applier.as_str() {
            "nmcli" | "dry-run" => {}
            _ => anyhow::bail!(
                "NETSWITCH_APPLIER '{}' is not supported. \
                Supported appliers: nmcli, dry-run",
                self.applier
            ),
        }

        if !(100..=60_000).contains(&self.poll_interval_ms) {
            anyhow::bail!(
                "NETSWITCH_POLL_INTERVAL_MS must be between 100 and 60000. Got: {}",
                self.poll_interval_ms
            );
        }

        if self.debounce_ms > 60_000 {
            anyhow::bail!(
                "NETSWITCH_DEBOUNCE_MS must be at most 60000. Got: {}",
                self.debounce_ms
            );
        }

        if !(1..=10).contains(&self.failure_threshold) {
            anyhow::bail!(
                "NETSWITCH_FAILURE_THRESHOLD must be between 1 and 10. Got: {}",
                self.failure_threshold
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "NETSWITCH_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        self.engine_config().validate()?;
        self.watcher_config().validate()?;

        Ok(())
    }

    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            failure_threshold: self.failure_threshold,
            directional_guard: self.directional_guard,
            ..EngineConfig::default()
        }
    }

    fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            poll_interval_ms: self.poll_interval_ms,
            debounce_ms: self.debounce_ms,
        }
    }

    /// Read, normalise and validate `NETSWITCH_CONFIG_FILE`
    fn load_seed(&self) -> Result<Option<AutoSwitchConfig>> {
        let Some(path) = &self.config_file else {
            return Ok(None);
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read NETSWITCH_CONFIG_FILE {}", path))?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("NETSWITCH_CONFIG_FILE {} is not valid JSON", path))?;
        let seed = normalize(&value).config;
        seed.validate()
            .with_context(|| format!("NETSWITCH_CONFIG_FILE {} was rejected", path))?;
        Ok(Some(seed))
    }

    fn tracing_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a non-negative integer. Got: {}", name, raw)),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("not a boolean: {}", raw),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return NetswitchExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return NetswitchExitCode::ConfigError.into();
    }

    let seed = match config.load_seed() {
        Ok(seed) => seed,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return NetswitchExitCode::ConfigError.into();
        }
    };

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.tracing_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return NetswitchExitCode::ConfigError.into();
    }

    info!("Starting netswitchd daemon");
    info!(
        "Strategy: {}, applier: {}, store: {}",
        config.strategy, config.applier, config.store_path
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return NetswitchExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config, seed).await {
            error!("Daemon error: {:#}", e);
            NetswitchExitCode::RuntimeError
        } else {
            NetswitchExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config, seed: Option<AutoSwitchConfig>) -> Result<()> {
    let backend = FileConfigStore::new(&config.store_path)
        .await
        .with_context(|| format!("Failed to open store {}", config.store_path))?;
    let store = ProfileStore::open(Box::new(backend)).await?;
    match store.config() {
        Some(c) => info!(
            "Loaded configuration for {} (enabled: {}, active: {})",
            c.target_adapter_name, c.enabled, c.active_profile
        ),
        None => info!("No auto-switch configuration stored yet"),
    }

    let snapshots: Arc<dyn SnapshotSource> = Arc::new(SysfsSnapshotSource::new());

    let mut ping = PingProbe::new();
    if let Some(interface) = &config.ping_interface {
        ping = ping.with_interface(interface.clone());
    }
    if !ping.is_available() {
        warn!("No {} binary on PATH; probe-driven switching is unavailable", ping.program());
    }
    let probe: Arc<dyn ReachabilityProbe> = Arc::new(ping);

    let applier: Arc<dyn ConfigApplier> = match config.applier.as_str() {
        "dry-run" => {
            warn!("Dry-run applier: adapter configuration will not change");
            Arc::new(DryRunApplier::new())
        }
        _ => {
            let nmcli = NmcliApplier::new();
            if !nmcli.is_available() {
                warn!("nmcli not found; applying profiles will fail");
            }
            Arc::new(nmcli)
        }
    };

    let toggle: Box<dyn SwitchExecutor> = Box::new(DirectToggleExecutor::new(
        Arc::clone(&applier),
        Arc::clone(&snapshots),
    ));
    let (primary, fallback) = match config.strategy.as_str() {
        "toggle" => (toggle, None),
        _ => {
            let probe_driven: Box<dyn SwitchExecutor> = Box::new(ProbeDrivenExecutor::new(
                applier,
                Arc::clone(&probe),
                Arc::clone(&snapshots),
            ));
            (probe_driven, Some(toggle))
        }
    };

    let (engine, mut events) = DecisionEngine::new(
        Arc::clone(&snapshots),
        probe,
        primary,
        Box::new(LoggingIndicator),
        store,
        config.engine_config(),
    )?;
    let mut engine = match fallback {
        Some(fallback) => engine.with_fallback_executor(fallback),
        None => engine,
    };

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    if let Some(seed) = seed {
        info!("Applying configuration for {}", seed.target_adapter_name);
        engine.configure(seed).await?;
    }

    let watcher = LinkWatcher::new(snapshots, config.watcher_config())?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => error!("Shutdown signal error: {:#}", e),
        }
        let _ = shutdown_tx.send(());
    });

    info!("Daemon initialized, watching links");
    engine.run_with_shutdown(&watcher, Some(shutdown_rx)).await?;
    info!("Shutting down daemon");

    Ok(())
}

fn log_event(event: &EngineEvent) {
    match event {
        EngineEvent::Switched { .. }
        | EngineEvent::BothFailed { .. }
        | EngineEvent::ConfigChanged { .. } => info!("Engine event: {:?}", event),
        _ => debug!("Engine event: {:?}", event),
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.store_path, DEFAULT_STORE_PATH);
        assert_eq!(config.strategy, "probe");
        assert_eq!(config.applier, "nmcli");
        assert_eq!(config.poll_interval_ms, 1_000);
        assert_eq!(config.debounce_ms, 3_500);
        assert_eq!(config.failure_threshold, 2);
        assert!(config.directional_guard);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("NETSWITCH_STRATEGY", "toggle"),
            ("NETSWITCH_APPLIER", "dry-run"),
            ("NETSWITCH_FAILURE_THRESHOLD", "3"),
            ("NETSWITCH_DIRECTIONAL_GUARD", "off"),
            ("NETSWITCH_DEBOUNCE_MS", " 500 "),
        ])
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.engine_config().failure_threshold, 3);
        assert!(!config.engine_config().directional_guard);
        assert_eq!(config.watcher_config().debounce_ms, 500);
    }

    #[test]
    fn test_unparseable_numbers_are_errors() {
        assert!(config_from(&[("NETSWITCH_POLL_INTERVAL_MS", "fast")]).is_err());
        assert!(config_from(&[("NETSWITCH_FAILURE_THRESHOLD", "-1")]).is_err());
        assert!(config_from(&[("NETSWITCH_DIRECTIONAL_GUARD", "maybe")]).is_err());
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        for vars in [
            [("NETSWITCH_STRATEGY", "random")],
            [("NETSWITCH_APPLIER", "netplan")],
            [("NETSWITCH_POLL_INTERVAL_MS", "10")],
            [("NETSWITCH_FAILURE_THRESHOLD", "0")],
            [("NETSWITCH_LOG_LEVEL", "loud")],
        ] {
            let config = config_from(&vars).unwrap();
            assert!(config.validate().is_err(), "{:?} should be rejected", vars);
        }
    }

    #[test]
    fn test_missing_seed_file_is_an_error() {
        let config = config_from(&[("NETSWITCH_CONFIG_FILE", "/nonexistent/netswitch.json")])
            .unwrap();
        assert!(config.load_seed().is_err());
        assert!(config_from(&[]).unwrap().load_seed().unwrap().is_none());
    }

    #[test]
    fn test_log_levels() {
        let config = config_from(&[("NETSWITCH_LOG_LEVEL", "DEBUG")]).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.tracing_level(), Level::DEBUG);
    }
}
