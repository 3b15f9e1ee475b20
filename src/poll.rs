//! Bounded poll-with-timeout abstraction.
//!
//! The store offers no push notification for configuration propagation or
//! bucket removal, so two places in the workflow wait by polling: the
//! versioning-convergence wait and the bucket-deletion wait. Both share
//! this abstraction so neither can hang indefinitely: a fixed interval, a
//! fixed attempt ceiling, and a probe that reports "settled" or "not yet".
//!
//! Cancellation is honored before every probe and during every sleep.

use std::future::Future;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::debug;

use crate::types::error::DecommissionError;
use crate::types::token::WorkflowCancellationToken;

/// A bounded polling schedule: `max_attempts` probes spaced `interval` apart.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

/// Outcome of a bounded poll.
#[derive(Debug, PartialEq)]
pub enum PollOutcome<T> {
    /// The probe reported the awaited condition.
    Completed(T),
    /// The attempt ceiling was exhausted without the condition holding.
    TimedOut { attempts: u32 },
}

impl PollPolicy {
    /// Probe until `probe` returns `Some`, the attempt ceiling is reached,
    /// the probe fails, or the token is cancelled.
    ///
    /// Probe errors propagate immediately; the caller maps a `TimedOut`
    /// outcome to its domain-specific timeout error.
    pub async fn poll_until<T, F, Fut>(
        &self,
        token: &WorkflowCancellationToken,
        mut probe: F,
    ) -> Result<PollOutcome<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        for attempt in 1..=self.max_attempts {
            if token.is_cancelled() {
                return Err(anyhow!(DecommissionError::Cancelled));
            }

            if let Some(value) = probe().await? {
                debug!(attempt = attempt, "poll condition settled.");
                return Ok(PollOutcome::Completed(value));
            }

            if attempt < self.max_attempts {
                tokio::select! {
                    _ = tokio::time::sleep(self.interval) => {}
                    _ = token.cancelled() => {
                        return Err(anyhow!(DecommissionError::Cancelled));
                    }
                }
            }
        }

        Ok(PollOutcome::TimedOut {
            attempts: self.max_attempts,
        })
    }
}
