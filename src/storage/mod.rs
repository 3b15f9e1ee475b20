use anyhow::Result;
use async_channel::Sender;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use dyn_clone::DynClone;
use std::sync::Arc;

use crate::config::{ClientConfig, Config};
use crate::types::token::WorkflowCancellationToken;
use crate::types::{ObjectRecord, PurgeStatistics, VersioningMode};

pub mod s3;

/// Type alias for a boxed Storage trait object.
pub type Storage = Box<dyn StorageTrait + Send + Sync>;

/// Factory trait for creating Storage instances.
#[async_trait]
pub trait StorageFactory {
    async fn create(
        config: Config,
        cancellation_token: WorkflowCancellationToken,
        stats_sender: Sender<PurgeStatistics>,
        client_config: ClientConfig,
    ) -> Storage;
}

/// Storage operations needed by the decommission workflow.
///
/// Every method is a blocking round trip against the store. Failures are
/// mapped into the [`DecommissionError`](crate::types::error::DecommissionError)
/// taxonomy so the retry wrapper can distinguish transient from fatal
/// conditions; the idempotent-delete cases (`NoSuchBucket` on bucket
/// delete, `NoSuchKey`/404 on object delete) are swallowed here and
/// reported as success.
#[async_trait]
pub trait StorageTrait: DynClone {
    /// Check whether the target bucket exists and is visible to the
    /// caller's credentials.
    ///
    /// Uses a name-scoped ListBuckets rather than HeadBucket because
    /// head-style checks differ in permission semantics from list-style
    /// checks on some stores. "Not found" is a valid `false`, not an error.
    async fn bucket_exists(&self) -> Result<bool>;

    /// Read the bucket's current versioning mode.
    ///
    /// `NoSuchBucket` is treated as a transient condition here: during
    /// eventual-consistency windows a just-created bucket may not be
    /// visible to this call yet.
    async fn get_bucket_versioning(&self) -> Result<VersioningMode>;

    /// Request a versioning-mode transition. Asynchronous on the store
    /// side: the request is accepted but convergence is not instantaneous.
    async fn put_bucket_versioning(&self, mode: VersioningMode) -> Result<()>;

    /// List all object versions and delete markers, sending each record to
    /// the channel. Drains the listing to completion in a single forward
    /// pass, one page at a time.
    async fn list_object_versions(
        &self,
        sender: &Sender<ObjectRecord>,
        max_keys: i32,
    ) -> Result<()>;

    /// List plain (non-version-aware) objects, sending each record to the
    /// channel. Defensive sweep for catalogs where versioning was never
    /// enabled yet objects exist.
    async fn list_objects(&self, sender: &Sender<ObjectRecord>, max_keys: i32) -> Result<()>;

    /// Delete a single (key, version) pair; `version_id: None` is a plain
    /// object deletion. Returns `true` when a record was deleted and
    /// `false` when the target was already absent; both are success.
    async fn delete_object(&self, key: &str, version_id: Option<String>) -> Result<bool>;

    /// Issue the bucket-delete request. `NoSuchBucket` is success (the
    /// bucket may already be gone, e.g. from an earlier delete propagating
    /// during a retry).
    async fn delete_bucket(&self) -> Result<()>;

    /// Check whether the bucket is still present, for the post-delete
    /// confirmation poll. Returns `false` once the store reports absence.
    async fn head_bucket(&self) -> Result<bool>;

    /// Get the underlying AWS S3 Client for direct API access.
    fn get_client(&self) -> Option<Arc<Client>>;

    /// Get the statistics sender channel.
    fn get_stats_sender(&self) -> Sender<PurgeStatistics>;

    /// Send a statistics event through the channel.
    async fn send_stats(&self, stats: PurgeStatistics);
}

dyn_clone::clone_trait_object!(StorageTrait);

/// Create the S3 storage instance for a decommission run.
///
/// A missing client configuration falls back to the environment chain,
/// so a bare [`Config::for_bucket`] run always gets a working client.
/// The client region falls back to the bucket identity's region hint
/// when the configuration does not name one.
pub async fn create_storage(
    config: Config,
    cancellation_token: WorkflowCancellationToken,
    stats_sender: Sender<PurgeStatistics>,
) -> Storage {
    let mut client_config = config.target_client_config.clone().unwrap_or_default();
    if client_config.region.is_none() {
        client_config.region = config.target.region.clone();
    }

    s3::S3StorageFactory::create(config, cancellation_token, stats_sender, client_config).await
}
