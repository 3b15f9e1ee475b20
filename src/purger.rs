//! Purge stage: deletes every record the enumerator produces.
//!
//! Workers pull records off the shared channel until it closes, issuing
//! one delete per record. Versioned records and delete markers are deleted
//! against their exact version id; plain objects with a non-versioned
//! delete. Each delete runs under the store retry policy, so throttling
//! and 5xx responses are absorbed here rather than failing the run.
//!
//! A delete that exhausts its retry budget or fails fatally cancels the
//! whole run. Partial purges leave the bucket in a valid intermediate
//! state; a rerun re-enumerates whatever survived.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::stage::Stage;
use crate::types::error::is_transient_error;
use crate::types::{ObjectRecord, PurgeReport, PurgeStatistics};

pub struct ObjectPurger {
    worker_index: u16,
    base: Stage,
    report: Arc<PurgeReport>,
}

impl ObjectPurger {
    pub fn new(worker_index: u16, base: Stage, report: Arc<PurgeReport>) -> Self {
        Self {
            worker_index,
            base,
            report,
        }
    }

    /// Drain the record channel, deleting every record received.
    ///
    /// Returns when the channel closes (catalog exhausted), the token is
    /// cancelled, or a delete fails terminally. The terminal-failure path
    /// cancels the token so sibling workers and the enumerator stop too.
    pub async fn purge(&self) -> Result<()> {
        let receiver = self
            .base
            .receiver
            .as_ref()
            .context("purge stage requires a receiver.")?;

        loop {
            tokio::select! {
                result = receiver.recv() => {
                    let Ok(record) = result else {
                        debug!(worker_index = self.worker_index, "record channel closed.");
                        return Ok(());
                    };

                    match self.delete_record(&record).await {
                        Ok(true) => {
                            self.report.record(&record);
                            self.base
                                .send_stats(PurgeStatistics::PurgeComplete {
                                    key: record.key().to_string(),
                                })
                                .await;
                        }
                        Ok(false) => {
                            // Another actor got there first; not fatal, but
                            // worth flagging on the run.
                            warn!(
                                worker_index = self.worker_index,
                                key = record.key(),
                                "record was already absent, skipping."
                            );
                            self.base.set_warning();
                            self.base
                                .send_stats(PurgeStatistics::PurgeSkip {
                                    key: record.key().to_string(),
                                })
                                .await;
                        }
                        Err(e) => {
                            error!(
                                worker_index = self.worker_index,
                                key = record.key(),
                                error = %e,
                                "purge failed, cancelling the run."
                            );
                            self.base
                                .send_stats(PurgeStatistics::PurgeError {
                                    key: record.key().to_string(),
                                })
                                .await;
                            self.base.cancellation_token.cancel();
                            return Err(e);
                        }
                    }
                }
                _ = self.base.cancellation_token.cancelled() => {
                    info!(worker_index = self.worker_index, "purge worker cancelled.");
                    return Ok(());
                }
            }
        }
    }

    async fn delete_record(&self, record: &ObjectRecord) -> Result<bool> {
        let key = record.key().to_string();
        let version_id = record.version_id().map(str::to_string);

        debug!(
            worker_index = self.worker_index,
            key = key,
            version_id = version_id.as_deref().unwrap_or("-"),
            delete_marker = record.is_delete_marker(),
            "deleting record."
        );

        self.base
            .config
            .store_retry
            .run("delete object", is_transient_error, || {
                self.base.target.delete_object(&key, version_id.clone())
            })
            .await
    }
}
