//! Composable retry wrapper for store calls.
//!
//! Transient store errors (throttling, 5xx, eventual-consistency gaps) are
//! retried with exponential backoff bounded by a delay ceiling. The policy
//! is applied at each store-call boundary rather than duplicated per call;
//! which error kinds are retryable is decided by a caller-supplied
//! predicate over `anyhow::Error`.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

/// Exponential-backoff retry policy.
///
/// Each failed attempt doubles the backoff, capped at `max_backoff`.
/// `max_attempts` counts the initial attempt, so `max_attempts: 1` means
/// no retries at all.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// The backoff to sleep after the given 1-based failed attempt.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `operation` under this policy.
    ///
    /// `retryable` decides whether a failure is worth another attempt;
    /// everything else is returned immediately with `operation_name`
    /// attached as context.
    pub async fn run<T, F, Fut, P>(
        &self,
        operation_name: &str,
        retryable: P,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&anyhow::Error) -> bool,
    {
        let mut attempt = 1u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && retryable(&e) => {
                    let backoff = self.backoff_after(attempt);
                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "store call failed with a retryable error, backing off."
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e.context(format!("{operation_name} failed.")));
                }
            }
        }
    }
}
