//! Bounded polling for asynchronous array-side state changes.
//!
//! The array applies some actions asynchronously (export visibility) and
//! serializes configuration edits behind a per-container lock. Callers poll
//! the configuration tree until the expected state shows up or the attempt
//! budget runs out; there is no other cancellation.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::metrics;

/// Interval and attempt budget for a poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    /// A zero attempt budget is raised to one so the predicate always runs.
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }
}

/// Evaluate `predicate` until it returns true or `policy.max_attempts`
/// evaluations have failed, sleeping `policy.interval` between attempts.
///
/// Returns whether the predicate was satisfied. Exhaustion is not an error
/// here; callers decide whether it is fatal.
pub async fn wait_for<F, Fut>(what: &str, policy: PollPolicy, mut predicate: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for attempt in 1..=policy.max_attempts {
        if predicate().await {
            if attempt > 1 {
                debug!(what, attempts = attempt, "Condition met after polling");
            }
            return true;
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    warn!(
        what,
        attempts = policy.max_attempts,
        interval_ms = policy.interval.as_millis() as u64,
        "Gave up waiting"
    );
    metrics::record_poll_timeout(what);
    false
}
