//! Contract Test: Ignored Adapter Classes
//!
//! Virtual and bluetooth adapters are never switched, even when configured
//! as the target.
//!
//! Constraints verified:
//! - A forced configure on an ignored target is skipped without probing
//! - Startup and link-up cycles on an ignored target are skipped alike
//! - Nothing is persisted or shown for an ignored target
//!
//! If this test fails, a VPN or tethering adapter can get reconfigured.

mod common;

use common::*;
use netswitch_core::engine::{CycleResult, EngineEvent, EngineState, SkipReason, Trigger};
use netswitch_core::profile::ProfileId;
use netswitch_core::traits::{AdapterClass, AdapterSnapshot, Decision, LinkEvent};
use serde_json::json;
use std::time::Duration;

fn switching_executor() -> MockExecutor {
    MockExecutor::returning(Decision::switched(
        ProfileId::ProfileB,
        Some("172.16.1.254".to_string()),
    ))
}

async fn ignored_target(class: AdapterClass) -> Harness {
    Harness::new(
        None,
        reachability_settings(),
        switching_executor(),
        AdapterSnapshot::new("Ethernet", class).with_link(true),
        false,
    )
    .await
}

#[tokio::test(start_paused = true)]
async fn virtual_target_is_never_evaluated() {
    let mut h = ignored_target(AdapterClass::Virtual).await;

    let result = h.engine.configure(scenario_config()).await.unwrap();
    assert_eq!(result, Some(CycleResult::Skipped(SkipReason::IgnoredAdapter)));

    tokio::time::sleep(Duration::from_secs(5)).await;
    let result = h.engine.evaluate(Trigger::Startup).await;
    assert_eq!(result, CycleResult::Skipped(SkipReason::IgnoredAdapter));

    assert_eq!(h.probe.call_count(), 0);
    assert_eq!(h.executor.call_count(), 0);
    assert!(h.indicator.colors().is_empty());
    assert_eq!(h.engine.state(), EngineState::Unlocked);
    assert_eq!(h.persisted().await["activeProfile"], json!("profileA"));

    let events = h.drain_events();
    assert!(events.contains(&EngineEvent::CycleSkipped {
        trigger: Trigger::UserConfigure,
        reason: SkipReason::IgnoredAdapter,
    }));
    assert!(events.contains(&EngineEvent::CycleSkipped {
        trigger: Trigger::Startup,
        reason: SkipReason::IgnoredAdapter,
    }));
}

#[tokio::test(start_paused = true)]
async fn bluetooth_target_ignores_link_up_and_reenable() {
    let mut h = ignored_target(AdapterClass::Bluetooth).await;

    let result = h.engine.configure(scenario_config()).await.unwrap();
    assert_eq!(result, Some(CycleResult::Skipped(SkipReason::IgnoredAdapter)));

    let result = h.engine.handle_link_event(LinkEvent::stable_up("Ethernet")).await;
    assert_eq!(result, Some(CycleResult::Skipped(SkipReason::IgnoredAdapter)));

    h.engine.set_enabled(false).await.unwrap();
    let result = h.engine.set_enabled(true).await.unwrap();
    assert_eq!(result, Some(CycleResult::Skipped(SkipReason::IgnoredAdapter)));

    assert_eq!(h.probe.call_count(), 0);
    assert_eq!(h.executor.call_count(), 0);
    assert!(h.indicator.colors().is_empty());
}
