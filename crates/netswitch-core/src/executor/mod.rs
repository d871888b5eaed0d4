//! Switch executor strategies
//!
//! Both strategies apply profiles through a [`crate::traits::ConfigApplier`]
//! and read readiness from a [`crate::traits::SnapshotSource`]:
//!
//! - [`ProbeDrivenExecutor`]: apply, wait for readiness, test gateway and
//!   ping target, fall over to the other profile (primary)
//! - [`DirectToggleExecutor`]: try DHCP, fall back to static when no lease
//!   arrives (no probing; used when pinging is impossible)

mod direct_toggle;
mod probe_driven;

pub use direct_toggle::DirectToggleExecutor;
pub use probe_driven::{ProbeDrivenExecutor, ProbeDrivenTiming};

use crate::profile::{NetworkProfile, ProfileId};

/// Pick `(current, other)` out of the two profiles
fn split<'a>(
    current_active: ProfileId,
    profile_a: &'a NetworkProfile,
    profile_b: &'a NetworkProfile,
) -> (&'a NetworkProfile, &'a NetworkProfile) {
    match current_active {
        ProfileId::ProfileA => (profile_a, profile_b),
        ProfileId::ProfileB => (profile_b, profile_a),
    }
}
