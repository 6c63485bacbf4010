//! Per-call retry loop with throttling classification.

use crate::backoff::BackoffPolicy;
use geobatch_abstraction::LocationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use tracing::{debug, warn};

/// Default attempt cap: one initial call plus four retries.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// The remote operation a call belongs to, used to tag failure logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Forward geocoding (text search).
    SearchByText,
    /// Reverse geocoding (position search).
    SearchByPosition,
    /// Route calculation.
    CalculateRoute,
}

impl OperationKind {
    /// Stable name used in log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SearchByText => "search-text",
            Self::SearchByPosition => "search-position",
            Self::CalculateRoute => "calculate-route",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retry policy for throttled remote calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts allowed per call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff applied between throttled attempts.
    #[serde(default)]
    pub backoff: BackoffPolicy,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, backoff: BackoffPolicy::default() }
    }
}

/// Outcome of one record's processing, after any retries.
///
/// The batch and route facades collapse this to present/absent; the richer
/// variants are kept through the internal pipeline so failure causes stay
/// distinguishable where they are produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome<R> {
    /// The call succeeded with at least one result entry.
    Resolved(R),
    /// The call succeeded with zero result entries; not an error.
    NotFound,
    /// Every allowed attempt was throttled.
    Exhausted,
    /// The call failed with a non-throttling fault.
    Failed(LocationError),
}

impl<R> ItemOutcome<R> {
    /// Collapse to the lossy present/absent contract.
    #[must_use]
    pub fn into_option(self) -> Option<R> {
        match self {
            Self::Resolved(payload) => Some(payload),
            Self::NotFound | Self::Exhausted | Self::Failed(_) => None,
        }
    }

    /// Whether the record resolved successfully.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Transform the resolved payload, leaving absent outcomes untouched.
    #[must_use]
    pub fn map<U, F>(self, f: F) -> ItemOutcome<U>
    where
        F: FnOnce(R) -> U,
    {
        match self {
            Self::Resolved(payload) => ItemOutcome::Resolved(f(payload)),
            Self::NotFound => ItemOutcome::NotFound,
            Self::Exhausted => ItemOutcome::Exhausted,
            Self::Failed(err) => ItemOutcome::Failed(err),
        }
    }
}

/// Issue one remote call and absorb throttling via backoff-and-retry.
///
/// `issue` performs the call and reduces the response: `Ok(Some(_))` is a
/// usable result, `Ok(None)` is a legitimate "not found". Throttling faults
/// are retried up to `policy.max_attempts` total attempts, waiting a
/// full-jitter delay keyed on the upcoming attempt number (the first retry
/// is attempt 2). Any other fault ends the call immediately.
///
/// No fault escapes this function; failure paths emit a `warn!` tagged with
/// the operation kind and resolve to an absent-style outcome.
pub async fn call_with_retry<R, F, Fut>(
    operation: OperationKind,
    policy: &RetryPolicy,
    issue: F,
) -> ItemOutcome<R>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Option<R>, LocationError>>,
{
    let mut attempt: u32 = 1;

    loop {
        match issue().await {
            Ok(Some(payload)) => return ItemOutcome::Resolved(payload),
            Ok(None) => return ItemOutcome::NotFound,
            Err(err) if err.is_throttling() => {
                if attempt >= policy.max_attempts {
                    warn!(
                        operation = operation.as_str(),
                        attempts = attempt,
                        error = %err,
                        "Throttled on every attempt; giving up"
                    );
                    return ItemOutcome::Exhausted;
                }

                attempt += 1;
                debug!(
                    operation = operation.as_str(),
                    attempt = attempt,
                    "Throttled; backing off before retry"
                );
                policy.backoff.wait(attempt).await;
            }
            Err(err) => {
                warn!(
                    operation = operation.as_str(),
                    error = %err,
                    "Remote call failed; not retryable"
                );
                return ItemOutcome::Failed(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: BackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(4)),
        }
    }

    #[tokio::test]
    async fn persistent_throttling_makes_exactly_five_attempts() {
        let calls = AtomicU32::new(0);

        let outcome: ItemOutcome<u32> = call_with_retry(OperationKind::SearchByText, &fast_policy(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LocationError::Throttled { message: None })
        })
        .await;

        assert_eq!(outcome, ItemOutcome::Exhausted);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn success_on_third_attempt_short_circuits() {
        let calls = AtomicU32::new(0);

        let outcome = call_with_retry(OperationKind::SearchByPosition, &fast_policy(), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(LocationError::Throttled { message: None })
            } else {
                Ok(Some(n))
            }
        })
        .await;

        assert_eq!(outcome, ItemOutcome::Resolved(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_result_is_not_found_and_not_retried() {
        let calls = AtomicU32::new(0);

        let outcome: ItemOutcome<u32> = call_with_retry(OperationKind::SearchByText, &fast_policy(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        })
        .await;

        assert_eq!(outcome, ItemOutcome::NotFound);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_throttling_fault_is_not_retried() {
        let calls = AtomicU32::new(0);

        let outcome: ItemOutcome<u32> = call_with_retry(OperationKind::CalculateRoute, &fast_policy(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LocationError::ServiceError("bad calculator".to_string()))
        })
        .await;

        assert_eq!(
            outcome,
            ItemOutcome::Failed(LocationError::ServiceError("bad calculator".to_string()))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn immediate_success_makes_one_call() {
        let calls = AtomicU32::new(0);

        let outcome = call_with_retry(OperationKind::SearchByText, &fast_policy(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some("payload"))
        })
        .await;

        assert_eq!(outcome, ItemOutcome::Resolved("payload"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn outcome_collapse() {
        assert_eq!(ItemOutcome::Resolved(7).into_option(), Some(7));
        assert_eq!(ItemOutcome::<u32>::NotFound.into_option(), None);
        assert_eq!(ItemOutcome::<u32>::Exhausted.into_option(), None);
        assert_eq!(
            ItemOutcome::<u32>::Failed(LocationError::RequestError("x".to_string())).into_option(),
            None
        );
    }
}
