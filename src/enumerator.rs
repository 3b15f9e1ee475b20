//! Enumeration stage: drains the bucket's object catalogs into the purge
//! channel.
//!
//! Two catalogs feed the purge. The versioned catalog holds every data
//! version and delete marker the bucket has accumulated; the plain-object
//! catalog covers buckets where versioning was never enabled yet objects
//! exist. Both are drained in a single forward pass, versioned records
//! first.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::stage::Stage;

pub struct VersionEnumerator {
    base: Stage,
}

impl VersionEnumerator {
    pub fn new(base: Stage) -> Self {
        Self { base }
    }

    /// Drain both catalogs through the stage's sender.
    ///
    /// Returns `Ok` when both listings complete or the run is cancelled
    /// mid-listing; the storage layer stops paging cleanly on
    /// cancellation. Dropping the `VersionEnumerator` closes the sender,
    /// which is how purge workers learn the catalog is exhausted.
    pub async fn enumerate(&self) -> Result<()> {
        let sender = self
            .base
            .sender
            .as_ref()
            .context("enumeration stage requires a sender.")?;
        let max_keys = self.base.config.max_keys;

        debug!(
            bucket = self.base.config.target.name,
            "enumerating versioned catalog."
        );
        self.base
            .target
            .list_object_versions(sender, max_keys)
            .await
            .context("failed to enumerate object versions.")?;

        if self.base.cancellation_token.is_cancelled() {
            info!("enumeration cancelled.");
            return Ok(());
        }

        debug!(
            bucket = self.base.config.target.name,
            "enumerating plain-object catalog."
        );
        self.base
            .target
            .list_objects(sender, max_keys)
            .await
            .context("failed to enumerate plain objects.")?;

        Ok(())
    }
}
