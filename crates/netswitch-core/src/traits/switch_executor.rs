// # Switch Executor Trait
//
// Defines the interface for the stay/switch decision that owns the actual
// OS-level profile application.
//
// ## Implementations
//
// - [`crate::executor::ProbeDrivenExecutor`]: apply, probe, fall over (primary)
// - [`crate::executor::DirectToggleExecutor`]: DHCP first, static if no lease (fallback)
//
// ## Usage
//
// ```rust,ignore
// let decision = executor
//     .decide("Ethernet", ProfileId::ProfileA, &config.profile_a, &config.profile_b)
//     .await?;
// match decision.outcome {
//     SwitchOutcome::Stay => {}
//     SwitchOutcome::Switched => println!("now on {}", decision.active_profile),
//     SwitchOutcome::BothFailed => println!("nothing reachable"),
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::profile::{NetworkProfile, ProfileId};

/// What the executor did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchOutcome {
    /// The current profile is kept
    Stay,
    /// The other profile was applied and is now active
    Switched,
    /// Neither profile was reachable; the current profile was restored
    BothFailed,
}

/// Result of one executor decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    #[serde(rename = "result")]
    pub outcome: SwitchOutcome,
    pub active_profile: ProfileId,
    /// The ping target the decision was actually based on
    pub actively_probed_target: Option<String>,
}

impl Decision {
    pub fn stay(active: ProfileId, probed: Option<String>) -> Self {
        Self {
            outcome: SwitchOutcome::Stay,
            active_profile: active,
            actively_probed_target: probed,
        }
    }

    pub fn switched(active: ProfileId, probed: Option<String>) -> Self {
        Self {
            outcome: SwitchOutcome::Switched,
            active_profile: active,
            actively_probed_target: probed,
        }
    }

    pub fn both_failed(active: ProfileId) -> Self {
        Self {
            outcome: SwitchOutcome::BothFailed,
            active_profile: active,
            actively_probed_target: None,
        }
    }
}

/// Trait for switch-decision executors
///
/// # Trust Level: Trusted (applies OS configuration)
///
/// - ✅ Apply either profile to the adapter and test it
/// - ✅ Bound every call it makes with its own timeouts
/// - ❌ Persist the active profile (owned by `DecisionEngine`)
/// - ❌ Implement cooldowns or locking (owned by `DecisionEngine`)
///
/// An `Err` means the decision could not be made at all (infrastructure
/// error); the engine logs it and retries later.
#[async_trait]
pub trait SwitchExecutor: Send + Sync {
    /// Decide between staying and switching, applying whatever is chosen
    async fn decide(
        &self,
        adapter_name: &str,
        current_active: ProfileId,
        profile_a: &NetworkProfile,
        profile_b: &NetworkProfile,
    ) -> Result<Decision, crate::Error>;

    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Whether the executor can run on this system
    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decision_wire_shape() {
        let decision = Decision::switched(ProfileId::ProfileB, Some("172.16.1.254".to_string()));
        let value = serde_json::to_value(&decision).unwrap();
        assert_eq!(
            value,
            json!({
                "result": "switched",
                "activeProfile": "profileB",
                "activelyProbedTarget": "172.16.1.254"
            })
        );
    }

    #[test]
    fn test_both_failed_has_no_target() {
        let decision = Decision::both_failed(ProfileId::ProfileA);
        assert_eq!(decision.outcome, SwitchOutcome::BothFailed);
        assert!(decision.actively_probed_target.is_none());
    }
}
