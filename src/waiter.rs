//! Bucket deletion and post-delete confirmation.
//!
//! A successful delete request does not mean the bucket is gone; the
//! store removes it asynchronously. The waiter issues the delete under
//! the store retry policy, then polls for absence on a bounded schedule
//! so the caller can report the bucket as actually removed.

use anyhow::{Result, anyhow};
use tracing::{debug, info};

use crate::config::Config;
use crate::poll::PollOutcome;
use crate::storage::Storage;
use crate::types::error::{DecommissionError, is_transient_error};
use crate::types::token::WorkflowCancellationToken;

pub struct BucketDeletionWaiter {
    config: Config,
    target: Storage,
    cancellation_token: WorkflowCancellationToken,
}

impl BucketDeletionWaiter {
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

    /// Delete the bucket and wait until the store stops reporting it.
    ///
    /// A bucket that is already gone when the delete lands is success.
    /// Exhausting the confirmation schedule yields
    /// [`DecommissionError::DeletionTimeout`].
    pub async fn delete_and_confirm(&self) -> Result<()> {
        info!(bucket = self.config.target.name, "deleting bucket.");
        self.config
            .store_retry
            .run("delete bucket", is_transient_error, || {
                self.target.delete_bucket()
            })
            .await?;

        let outcome = self
            .config
            .deletion_wait
            .poll_until(&self.cancellation_token, || async {
                let present = self
                    .config
                    .store_retry
                    .run("head bucket", is_transient_error, || {
                        self.target.head_bucket()
                    })
                    .await?;
                debug!(present = present, "bucket deletion probe.");
                if present { Ok(None) } else { Ok(Some(())) }
            })
            .await?;

        match outcome {
            PollOutcome::Completed(()) => {
                info!(bucket = self.config.target.name, "bucket deletion confirmed.");
                Ok(())
            }
            PollOutcome::TimedOut { attempts } => {
                Err(anyhow!(DecommissionError::DeletionTimeout { attempts }))
            }
        }
    }
}
