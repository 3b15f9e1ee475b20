//! Versioning control: read the bucket's mode, request a transition, and
//! wait for the store to converge on it.
//!
//! A versioning write is accepted asynchronously; the read-back may lag
//! behind the request. `transition` therefore polls the mode after the
//! write until the read-back matches, under a bounded schedule. A bucket
//! that never converges within the schedule fails the run rather than
//! hanging it.

use anyhow::{Result, anyhow};
use tracing::{debug, info};

use crate::config::Config;
use crate::poll::PollOutcome;
use crate::storage::Storage;
use crate::types::VersioningMode;
use crate::types::error::{DecommissionError, is_transient_error};
use crate::types::token::WorkflowCancellationToken;

pub struct VersioningController {
    config: Config,
    target: Storage,
    cancellation_token: WorkflowCancellationToken,
}

impl VersioningController {
    pub fn new(
        config: Config,
        target: Storage,
        cancellation_token: WorkflowCancellationToken,
    ) -> Self {
        Self {
            config,
            target,
            cancellation_token,
        }
    }

    /// Read the bucket's current versioning mode under the store retry
    /// policy.
    pub async fn read(&self) -> Result<VersioningMode> {
        self.config
            .store_retry
            .run("get bucket versioning", is_transient_error, || {
                self.target.get_bucket_versioning()
            })
            .await
    }

    /// Request a transition to `desired` and wait for the read-back to
    /// reflect it.
    ///
    /// `Unset` is not a requestable mode; asking for it is a
    /// configuration error. Convergence is confirmed by polling the mode
    /// on a bounded schedule; exhausting the schedule yields
    /// [`DecommissionError::ConvergenceTimeout`].
    pub async fn transition(&self, desired: VersioningMode) -> Result<()> {
        if desired.as_status().is_none() {
            return Err(anyhow!(DecommissionError::InvalidConfig(format!(
                "versioning mode {desired} cannot be requested."
            ))));
        }

        info!(
            bucket = self.config.target.name,
            desired = %desired,
            "requesting versioning transition."
        );
        self.config
            .store_retry
            .run("put bucket versioning", is_transient_error, || {
                self.target.put_bucket_versioning(desired)
            })
            .await?;

        let outcome = self
            .config
            .versioning_poll
            .poll_until(&self.cancellation_token, || async {
                let mode = self.read().await?;
                debug!(observed = %mode, desired = %desired, "versioning convergence probe.");
                if mode == desired {
                    Ok(Some(()))
                } else {
                    Ok(None)
                }
            })
            .await?;

        match outcome {
            PollOutcome::Completed(()) => {
                info!(bucket = self.config.target.name, mode = %desired, "versioning converged.");
                Ok(())
            }
            PollOutcome::TimedOut { attempts } => {
                Err(anyhow!(DecommissionError::ConvergenceTimeout { attempts }))
            }
        }
    }
}
