//! Full-jitter exponential backoff.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default backoff base delay.
pub const DEFAULT_BASE: Duration = Duration::from_millis(250);

/// Default backoff ceiling.
pub const DEFAULT_CAP: Duration = Duration::from_millis(6000);

/// Full-jitter backoff policy.
///
/// For attempt `a` (1-indexed), the delay is drawn uniformly from
/// `[base * a, min(cap, base * 2^a)]`: the floor grows linearly to guarantee
/// a minimum cooldown, the ceiling grows exponentially until the cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Base delay unit.
    #[serde(default = "default_base")]
    pub base: Duration,
    /// Upper bound for any single delay.
    #[serde(default = "default_cap")]
    pub cap: Duration,
}

fn default_base() -> Duration {
    DEFAULT_BASE
}

fn default_cap() -> Duration {
    DEFAULT_CAP
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self { base: DEFAULT_BASE, cap: DEFAULT_CAP }
    }
}

impl BackoffPolicy {
    /// Create a policy with explicit base and cap.
    #[must_use]
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Compute the randomized delay for a 1-indexed attempt number.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base.as_millis() as u64;
        let cap_ms = self.cap.as_millis() as u64;

        let exponential = if attempt >= 63 {
            u64::MAX
        } else {
            base_ms.saturating_mul(1u64 << attempt)
        };
        let upper = exponential.min(cap_ms);
        let lower = base_ms.saturating_mul(u64::from(attempt)).min(upper);

        let amount = rand::thread_rng().gen_range(lower..=upper);
        Duration::from_millis(amount)
    }

    /// Compute the delay for `attempt` and suspend the calling task for it.
    ///
    /// Only the calling task yields; other in-flight calls keep running.
    pub async fn wait(&self, attempt: u32) {
        tokio::time::sleep(self.delay(attempt)).await;
    }
}
