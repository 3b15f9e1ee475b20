//! The decommission workflow: probe, suspend versioning, purge, delete,
//! confirm.
//!
//! An absent bucket short-circuits to an unchanged result. A present
//! bucket has its versioning suspended when (and only when) versioning is
//! currently enabled, gets its catalogs purged when `force` is set, and
//! is then deleted with a bounded confirmation wait. The only observable
//! output is a [`DecommissionResult`]; failures surface through the
//! returned `Result` with the failing step named in the error context.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, anyhow};
use async_channel::Receiver;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::enumerator::VersionEnumerator;
use crate::purger::ObjectPurger;
use crate::stage::Stage;
use crate::storage::{Storage, create_storage};
use crate::types::error::{DecommissionError, is_transient_error};
use crate::types::token::WorkflowCancellationToken;
use crate::types::{
    DecommissionResult, PurgeReport, PurgeStatistics, PurgeSummary, VersioningMode,
};
use crate::versioning::VersioningController;
use crate::waiter::BucketDeletionWaiter;

pub struct DecommissionWorkflow {
    config: Config,
    target: Storage,
    cancellation_token: WorkflowCancellationToken,
    stats_receiver: Receiver<PurgeStatistics>,
    has_warning: Arc<AtomicBool>,
}

impl DecommissionWorkflow {
    /// Build a workflow backed by a real S3 storage instance.
    pub async fn new(
        config: Config,
        cancellation_token: WorkflowCancellationToken,
    ) -> Result<Self> {
        config.validate()?;

        let (stats_sender, stats_receiver) = async_channel::unbounded();
        let has_warning = Arc::new(AtomicBool::new(false));
        let target =
            create_storage(config.clone(), cancellation_token.clone(), stats_sender).await;

        Ok(Self {
            config,
            target,
            cancellation_token,
            stats_receiver,
            has_warning,
        })
    }

    /// Build a workflow over an externally supplied storage instance.
    pub fn with_storage(
        config: Config,
        target: Storage,
        cancellation_token: WorkflowCancellationToken,
        stats_receiver: Receiver<PurgeStatistics>,
        has_warning: Arc<AtomicBool>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            target,
            cancellation_token,
            stats_receiver,
            has_warning,
        })
    }

    /// Progress events emitted by purge workers during `run`.
    pub fn stats_receiver(&self) -> Receiver<PurgeStatistics> {
        self.stats_receiver.clone()
    }

    /// Whether any stage flagged a non-fatal issue.
    pub fn has_warning(&self) -> bool {
        self.has_warning.load(Ordering::SeqCst)
    }

    /// Execute the decommission end to end.
    pub async fn run(&self) -> Result<DecommissionResult> {
        let exists = self
            .config
            .store_retry
            .run("check bucket existence", is_transient_error, || {
                self.target.bucket_exists()
            })
            .await
            .context("existence probe failed.")?;

        if !exists {
            info!(
                bucket = self.config.target.name,
                "bucket is already absent, nothing to do."
            );
            return Ok(DecommissionResult::default());
        }

        let purged = if self.config.force {
            self.suspend_versioning_if_enabled().await?;
            self.purge_catalogs().await.context("purge failed.")?
        } else {
            PurgeSummary::default()
        };

        if self.cancellation_token.is_cancelled() {
            return Err(anyhow!(DecommissionError::Cancelled));
        }

        BucketDeletionWaiter::new(
            self.config.clone(),
            self.target.clone(),
            self.cancellation_token.clone(),
        )
        .delete_and_confirm()
        .await
        .context("bucket deletion failed.")?;

        info!(
            bucket = self.config.target.name,
            purged = purged.total(),
            "bucket decommissioned."
        );
        Ok(DecommissionResult {
            changed: true,
            purged,
        })
    }

    /// Suspend versioning when, and only when, it is currently enabled.
    ///
    /// `Suspended` and `Unset` buckets get no transition request: there
    /// is nothing to suspend, and `Unset` cannot even be requested.
    async fn suspend_versioning_if_enabled(&self) -> Result<()> {
        let controller = VersioningController::new(
            self.config.clone(),
            self.target.clone(),
            self.cancellation_token.clone(),
        );
        let mode = controller
            .read()
            .await
            .context("versioning read failed.")?;
        if mode == VersioningMode::Enabled {
            controller
                .transition(VersioningMode::Suspended)
                .await
                .context("versioning suspension failed.")?;
        } else {
            info!(mode = %mode, "versioning is not enabled, no transition requested.");
        }
        Ok(())
    }

    /// Run the enumeration and purge stages to completion.
    ///
    /// The enumerator owns the sender side of the record channel and
    /// closes it when both catalogs are drained; workers exit when the
    /// channel closes. A worker failure cancels the token, so the first
    /// error wins and the remaining tasks stop on their own.
    async fn purge_catalogs(&self) -> Result<PurgeSummary> {
        let (sender, receiver) = async_channel::bounded(self.config.purge_queue_size);
        let report = Arc::new(PurgeReport::new());

        let mut worker_handles: Vec<JoinHandle<Result<()>>> = Vec::new();
        for worker_index in 0..self.config.purge_worker_size {
            let stage = Stage::new(
                self.config.clone(),
                self.target.clone(),
                Some(receiver.clone()),
                None,
                self.cancellation_token.clone(),
                self.has_warning.clone(),
            );
            let purger = ObjectPurger::new(worker_index, stage, report.clone());
            worker_handles.push(tokio::spawn(async move { purger.purge().await }));
        }
        drop(receiver);

        let enumerator_stage = Stage::new(
            self.config.clone(),
            self.target.clone(),
            None,
            Some(sender),
            self.cancellation_token.clone(),
            self.has_warning.clone(),
        );
        let enumerator_handle: JoinHandle<Result<()>> = tokio::spawn(async move {
            let enumerator = VersionEnumerator::new(enumerator_stage);
            enumerator.enumerate().await
        });

        let enumeration = enumerator_handle
            .await
            .context("enumeration task panicked.")?;
        if let Err(e) = &enumeration {
            warn!(error = %e, "enumeration failed, cancelling purge workers.");
            self.cancellation_token.cancel();
        }

        let mut first_worker_error = None;
        for handle in worker_handles {
            let joined = handle.await.context("purge worker panicked.")?;
            if let Err(e) = joined {
                if first_worker_error.is_none() {
                    first_worker_error = Some(e);
                }
            }
        }

        // A failed worker cancels the run and can make the enumerator fail
        // on a closed channel, so the worker error is the root cause.
        if let Some(e) = first_worker_error {
            return Err(e);
        }
        enumeration?;

        Ok(report.snapshot())
    }
}

/// Decommission a bucket with default configuration.
pub async fn decommission_bucket(bucket: &str, force: bool) -> Result<DecommissionResult> {
    let mut config = Config::for_bucket(bucket);
    config.force = force;

    let cancellation_token = crate::types::token::create_workflow_cancellation_token();
    let workflow = DecommissionWorkflow::new(config, cancellation_token).await?;
    workflow.run().await
}
