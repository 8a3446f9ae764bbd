// ── Reconnect backoff ──
//
// Delay policy for reconnect attempts after the connection drops. The
// first `grace` hard failures all wait the base interval; after that the
// delay grows linearly until it reaches the cap.

use std::time::Duration;

/// Base reconnect interval when none is configured.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Upper bound on any reconnect delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(120);

/// Hard failures tolerated at the base interval before the delay grows.
pub const GRACE_FAILURES: u32 = 12;

/// Consecutive hard failures after which the TV is reported unreachable.
pub const OFFLINE_THRESHOLD: u32 = 3;

/// Linear backoff with a grace period and a hard cap.
///
/// `delay = min(cap, base * max(1, failures - grace))`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub grace: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_INTERVAL)
    }
}

impl BackoffPolicy {
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            cap: MAX_BACKOFF,
            grace: GRACE_FAILURES,
        }
    }

    /// Delay before the next attempt, given consecutive hard failures so far.
    pub fn delay(&self, failures: u32) -> Duration {
        let multiplier = failures.saturating_sub(self.grace).max(1);
        self.base.saturating_mul(multiplier).min(self.cap)
    }

    /// `true` once enough hard failures have piled up to call the TV offline.
    pub fn is_offline(&self, failures: u32) -> bool {
        failures >= OFFLINE_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grace_period_uses_base_interval() {
        let policy = BackoffPolicy::new(Duration::from_secs(5));
        for failures in 0..=GRACE_FAILURES {
            assert_eq!(policy.delay(failures), Duration::from_secs(5));
        }
    }

    #[test]
    fn delay_grows_linearly_after_grace() {
        let policy = BackoffPolicy::new(Duration::from_secs(5));
        assert_eq!(policy.delay(13), Duration::from_secs(5));
        assert_eq!(policy.delay(14), Duration::from_secs(10));
        assert_eq!(policy.delay(20), Duration::from_secs(40));
    }

    #[test]
    fn delay_is_capped_and_never_below_base() {
        let policy = BackoffPolicy::new(Duration::from_secs(5));
        assert_eq!(policy.delay(40), MAX_BACKOFF);
        assert_eq!(policy.delay(u32::MAX), MAX_BACKOFF);

        for failures in 0..200 {
            let delay = policy.delay(failures);
            assert!(delay >= policy.base && delay <= policy.cap, "{failures}: {delay:?}");
        }
    }

    #[test]
    fn offline_after_three_hard_failures() {
        let policy = BackoffPolicy::default();
        assert!(!policy.is_offline(2));
        assert!(policy.is_offline(3));
        assert!(policy.is_offline(9));
    }
}
