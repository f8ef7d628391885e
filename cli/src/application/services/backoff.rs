//! Bounded polling with exponential spacing.
//!
//! Used to wait for provider-side state transitions (image saving, server
//! booting, server deletion). Only the waiting loop retries; an error
//! returned by the check itself aborts the wait at once.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tokio::time::{Instant, sleep};

use crate::domain::MigraError;

/// Spacing and deadline of a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Sleep after the first unsuccessful check. Doubled after each one.
    pub initial: Duration,
    /// Deadline measured from the first check.
    pub timeout: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
        }
    }
}

impl Backoff {
    /// Sleep that follows the check numbered `attempt` (from 0).
    #[must_use]
    pub fn interval(&self, attempt: u32) -> Duration {
        1u32.checked_shl(attempt)
            .and_then(|factor| self.initial.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub ready: bool,
    /// Observed state, reported when the wait times out.
    pub label: String,
}

impl Probe {
    pub fn ready(label: impl Into<String>) -> Self {
        Self {
            ready: true,
            label: label.into(),
        }
    }

    pub fn pending(label: impl Into<String>) -> Self {
        Self {
            ready: false,
            label: label.into(),
        }
    }
}

/// Call `check` until it reports ready, sleeping `initial << attempt` in
/// between, and return the number of checks made.
///
/// Sleeps never extend past `start + timeout`. Once the deadline has passed
/// one last check is made before giving up.
///
/// # Errors
///
/// Returns `MigraError::Timeout` carrying the last observed label, or the
/// first error returned by `check`.
pub async fn await_condition<F, Fut>(policy: &Backoff, mut check: F) -> Result<u32>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe>>,
{
    let start = Instant::now();
    let deadline = start + policy.timeout;
    let mut attempt: u32 = 0;
    loop {
        let probe = check().await?;
        attempt = attempt.saturating_add(1);
        if probe.ready {
            tracing::debug!(label = %probe.label, attempts = attempt, "condition met");
            return Ok(attempt);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(MigraError::Timeout {
                label: probe.label,
                waited: now - start,
            }
            .into());
        }
        let pause = policy.interval(attempt - 1).min(deadline - now);
        tracing::debug!(label = %probe.label, attempt, ?pause, "condition not met");
        sleep(pause).await;
    }
}
