//! Link watcher
//!
//! Turns periodic adapter snapshots into debounced link events.
//!
//! - `down → up` starts (or restarts) a debounce timer; when it fires the
//!   adapter is re-read and, if still up, one `StableLinkUp` is emitted
//! - `up → down` emits `LinkDown` immediately and cancels a pending timer
//! - An adapter that vanishes while up counts as `up → down`
//! - The first observation of an adapter only records its state
//!
//! Virtual and bluetooth adapters are never tracked. Every other adapter
//! is, so the engine can be retargeted without restarting the watcher.

use std::collections::{HashMap, HashSet};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::Stream;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use crate::config::WatcherConfig;
use crate::error::Result;
use crate::traits::{AdapterSnapshot, LinkEvent, LinkSource, SnapshotSource};

#[derive(Debug, Clone, Copy)]
struct LinkTrack {
    up: bool,
    /// Debounce deadline of a pending link-up
    pending: Option<Instant>,
}

/// Link state per adapter plus pending debounce deadlines
///
/// Pure bookkeeping; [`LinkWatcher`] drives it from snapshots and timers.
#[derive(Debug, Clone)]
pub struct LinkTracker {
    debounce: Duration,
    links: HashMap<String, LinkTrack>,
}

impl LinkTracker {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            links: HashMap::new(),
        }
    }

    /// Feed one full snapshot, returning immediate events (link-down only)
    pub fn observe(&mut self, snapshots: &[AdapterSnapshot], now: Instant) -> Vec<LinkEvent> {
        let mut events = Vec::new();
        let mut seen = HashSet::new();

        for snapshot in snapshots.iter().filter(|s| !s.classification.is_ignored()) {
            seen.insert(snapshot.name.as_str());

            let Some(track) = self.links.get_mut(&snapshot.name) else {
                debug!(
                    "Tracking {} (link {})",
                    snapshot.name,
                    if snapshot.is_enabled { "up" } else { "down" }
                );
                self.links.insert(
                    snapshot.name.clone(),
                    LinkTrack {
                        up: snapshot.is_enabled,
                        pending: None,
                    },
                );
                continue;
            };

            match (track.up, snapshot.is_enabled) {
                (false, true) => {
                    debug!("Link up on {}, debouncing for {:?}", snapshot.name, self.debounce);
                    track.up = true;
                    track.pending = Some(now + self.debounce);
                }
                (true, false) => {
                    track.up = false;
                    if track.pending.take().is_some() {
                        debug!("Link on {} dropped during debounce", snapshot.name);
                    }
                    events.push(LinkEvent::down(snapshot.name.clone()));
                }
                _ => {}
            }
        }

        self.links.retain(|name, track| {
            if seen.contains(name.as_str()) {
                return true;
            }
            if track.up {
                debug!("Adapter {} disappeared while up", name);
                events.push(LinkEvent::down(name.clone()));
            }
            false
        });

        events
    }

    /// Earliest pending debounce deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.links.values().filter_map(|t| t.pending).min()
    }

    /// Adapters whose debounce expired at `now`; their timers are cleared
    pub fn take_due(&mut self, now: Instant) -> Vec<String> {
        let mut due: Vec<String> = Vec::new();
        for (name, track) in self.links.iter_mut() {
            if track.pending.is_some_and(|at| at <= now) {
                track.pending = None;
                due.push(name.clone());
            }
        }
        due.sort();
        due
    }

    /// Resolve an expired debounce with a fresh reading
    ///
    /// Still up yields `StableLinkUp`. Otherwise the link is recorded as down
    /// and nothing is emitted.
    pub fn confirm(&mut self, name: &str, still_up: bool) -> Option<LinkEvent> {
        if still_up {
            return Some(LinkEvent::stable_up(name));
        }
        if let Some(track) = self.links.get_mut(name) {
            track.up = false;
        }
        debug!("Link on {} gone at debounce expiry, discarding", name);
        None
    }

    /// Whether `name` is currently recorded as up
    pub fn is_up(&self, name: &str) -> Option<bool> {
        self.links.get(name).map(|t| t.up)
    }
}

/// Polling link watcher over a [`SnapshotSource`]
pub struct LinkWatcher {
    source: Arc<dyn SnapshotSource>,
    config: WatcherConfig,
}

impl LinkWatcher {
    /// Create a watcher
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the settings are unusable.
    pub fn new(source: Arc<dyn SnapshotSource>, config: WatcherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { source, config })
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }
}

impl LinkSource for LinkWatcher {
    fn watch(&self) -> Pin<Box<dyn Stream<Item = LinkEvent> + Send + 'static>> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        let source = Arc::clone(&self.source);
        let poll_interval = self.config.poll_interval();
        let debounce = self.config.debounce();

        tokio::spawn(async move {
            info!(
                "Starting link monitoring (interval={:?}, debounce={:?})",
                poll_interval, debounce
            );

            let mut tracker = LinkTracker::new(debounce);
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let deadline = tracker.next_deadline();

                let events = tokio::select! {
                    _ = ticker.tick() => poll(source.as_ref(), &mut tracker).await,
                    _ = sleep_until_opt(deadline) => confirm_due(source.as_ref(), &mut tracker).await,
                    _ = tx.closed() => {
                        debug!("Receiver dropped, stopping link monitor");
                        break;
                    }
                };

                for event in events {
                    info!("Link event: {:?}", event);
                    if tx.send(event).is_err() {
                        debug!("Receiver dropped, stopping link monitor");
                        return;
                    }
                }
            }
        });

        Box::pin(UnboundedReceiverStream::new(rx))
    }
}

async fn poll(source: &dyn SnapshotSource, tracker: &mut LinkTracker) -> Vec<LinkEvent> {
    match source.snapshots().await {
        Ok(snapshots) => tracker.observe(&snapshots, Instant::now()),
        Err(e) => {
            warn!("Failed to read adapter snapshots: {}", e);
            Vec::new()
        }
    }
}

async fn confirm_due(source: &dyn SnapshotSource, tracker: &mut LinkTracker) -> Vec<LinkEvent> {
    let mut events = Vec::new();
    for name in tracker.take_due(Instant::now()) {
        let still_up = match source.snapshot(&name).await {
            Ok(Some(snapshot)) => snapshot.is_enabled,
            Ok(None) => false,
            Err(e) => {
                warn!("Failed to re-read {} after debounce: {}", name, e);
                false
            }
        };
        events.extend(tracker.confirm(&name, still_up));
    }
    events
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::AdapterClass;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio_stream::StreamExt;

    fn eth(up: bool) -> AdapterSnapshot {
        AdapterSnapshot::new("Ethernet", AdapterClass::Ethernet).with_link(up)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_observation_only_records() {
        let mut tracker = LinkTracker::new(Duration::from_millis(3500));
        let events = tracker.observe(&[eth(true)], Instant::now());
        assert!(events.is_empty());
        assert_eq!(tracker.is_up("Ethernet"), Some(true));
        assert!(tracker.next_deadline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_up_is_debounced_and_restarted() {
        let debounce = Duration::from_millis(3500);
        let mut tracker = LinkTracker::new(debounce);
        let t0 = Instant::now();
        tracker.observe(&[eth(false)], t0);

        assert!(tracker.observe(&[eth(true)], t0).is_empty());
        assert_eq!(tracker.next_deadline(), Some(t0 + debounce));

        // flap: down emits immediately and cancels, up restarts the timer
        let t1 = t0 + Duration::from_secs(1);
        assert_eq!(
            tracker.observe(&[eth(false)], t1),
            vec![LinkEvent::down("Ethernet")]
        );
        assert!(tracker.next_deadline().is_none());
        tracker.observe(&[eth(true)], t1);
        assert_eq!(tracker.next_deadline(), Some(t1 + debounce));

        assert!(tracker.take_due(t0 + debounce).is_empty());
        assert_eq!(tracker.take_due(t1 + debounce), vec!["Ethernet".to_string()]);
        assert_eq!(
            tracker.confirm("Ethernet", true),
            Some(LinkEvent::stable_up("Ethernet"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_debounce_on_dead_link_is_silent() {
        let mut tracker = LinkTracker::new(Duration::from_millis(10));
        let now = Instant::now();
        tracker.observe(&[eth(false)], now);
        tracker.observe(&[eth(true)], now);

        assert_eq!(tracker.confirm("Ethernet", false), None);
        assert_eq!(tracker.is_up("Ethernet"), Some(false));
        // the next poll sees it down: no transition, no event
        assert!(tracker.observe(&[eth(false)], now).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_virtual_and_bluetooth_are_ignored() {
        let mut tracker = LinkTracker::new(Duration::from_millis(10));
        let now = Instant::now();
        let vpn = AdapterSnapshot::new("tun0", AdapterClass::Virtual);
        let bt = AdapterSnapshot::new("bnep0", AdapterClass::Bluetooth);
        tracker.observe(&[vpn.clone(), bt.clone()], now);
        tracker.observe(&[vpn.with_link(true), bt.with_link(true)], now);
        assert!(tracker.next_deadline().is_none());
        assert_eq!(tracker.is_up("tun0"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_vanished_adapter_counts_as_down() {
        let mut tracker = LinkTracker::new(Duration::from_millis(10));
        let now = Instant::now();
        tracker.observe(&[eth(true)], now);
        assert_eq!(tracker.observe(&[], now), vec![LinkEvent::down("Ethernet")]);
        assert_eq!(tracker.is_up("Ethernet"), None);
    }

    struct SharedSnapshots(Mutex<Vec<AdapterSnapshot>>);

    #[async_trait]
    impl SnapshotSource for SharedSnapshots {
        async fn snapshots(&self) -> Result<Vec<AdapterSnapshot>> {
            Ok(self.0.lock().unwrap().clone())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_emits_one_stable_up_then_down() {
        let source = Arc::new(SharedSnapshots(Mutex::new(vec![eth(false)])));
        let watcher = LinkWatcher::new(source.clone(), WatcherConfig::default()).unwrap();
        let mut stream = watcher.watch();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        *source.0.lock().unwrap() = vec![eth(true)];
        let plugged_at = Instant::now();

        let event = tokio::time::timeout(Duration::from_secs(10), stream.next())
            .await
            .unwrap();
        assert_eq!(event, Some(LinkEvent::stable_up("Ethernet")));
        assert!(plugged_at.elapsed() >= Duration::from_millis(3500));

        *source.0.lock().unwrap() = vec![eth(false)];
        let event = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .unwrap();
        assert_eq!(event, Some(LinkEvent::down("Ethernet")));
    }
}
