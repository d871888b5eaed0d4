// # Reachability Probe Trait
//
// A single reachability test against a host.
//
// ## Implementations
//
// - System `ping`: `netswitch-probe-ping` crate

use async_trait::async_trait;
use std::time::Duration;

/// Trait for reachability probes
///
/// # Trust Level: Untrusted
///
/// - ✅ Perform one bounded network test per call
/// - ❌ Retry (owned by the caller: `DecisionEngine` or an executor)
/// - ❌ Return errors: every failure (timeout, DNS, missing binary) is `false`
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Test whether `host` answers within `timeout`
    async fn probe(&self, host: &str, timeout: Duration) -> bool;

    /// Whether this probe can run at all on this system
    fn is_available(&self) -> bool {
        true
    }
}

/// Probe `host` up to `attempts` times; any success counts
///
/// The delay is only slept between attempts, never after the last one.
pub async fn probe_with_retries(
    probe: &dyn ReachabilityProbe,
    host: &str,
    timeout: Duration,
    attempts: u32,
    delay: Duration,
) -> bool {
    let tries = attempts.max(1);
    for i in 0..tries {
        if probe.probe(host, timeout).await {
            return true;
        }
        if i + 1 < tries {
            tokio::time::sleep(delay).await;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyProbe {
        calls: AtomicUsize,
        succeed_on: usize,
    }

    #[async_trait]
    impl ReachabilityProbe for FlakyProbe {
        async fn probe(&self, _host: &str, _timeout: Duration) -> bool {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            n == self.succeed_on
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_attempt_counts() {
        let probe = FlakyProbe {
            calls: AtomicUsize::new(0),
            succeed_on: 2,
        };
        let ok = probe_with_retries(
            &probe,
            "1.1.1.1",
            Duration::from_secs(1),
            2,
            Duration::from_millis(300),
        )
        .await;
        assert!(ok);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_bounded() {
        let probe = FlakyProbe {
            calls: AtomicUsize::new(0),
            succeed_on: 5,
        };
        let ok = probe_with_retries(&probe, "1.1.1.1", Duration::from_secs(1), 2, Duration::ZERO)
            .await;
        assert!(!ok);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_probes_once() {
        let probe = FlakyProbe {
            calls: AtomicUsize::new(0),
            succeed_on: 1,
        };
        assert!(probe_with_retries(&probe, "h", Duration::from_secs(1), 0, Duration::ZERO).await);
    }
}
