use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_channel::{Receiver, Sender};

use crate::config::Config;
use crate::storage::Storage;
use crate::types::token::WorkflowCancellationToken;
use crate::types::{ObjectRecord, PurgeStatistics};

/// Shared context passed to the enumeration and purge stages.
///
/// Channels connect the two stages: the enumerator writes records to
/// `sender` and has no `receiver`; purge workers read from `receiver` and
/// have no `sender` (the purge is the terminal stage). Each stage takes
/// ownership of a `Stage`, consuming it during workflow construction.
pub struct Stage {
    pub config: Config,
    pub target: Storage,
    pub receiver: Option<Receiver<ObjectRecord>>,
    pub sender: Option<Sender<ObjectRecord>>,
    pub cancellation_token: WorkflowCancellationToken,
    pub has_warning: Arc<AtomicBool>,
}

impl Stage {
    pub fn new(
        config: Config,
        target: Storage,
        receiver: Option<Receiver<ObjectRecord>>,
        sender: Option<Sender<ObjectRecord>>,
        cancellation_token: WorkflowCancellationToken,
        has_warning: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            target,
            receiver,
            sender,
            cancellation_token,
            has_warning,
        }
    }

    /// Send a statistics event through the storage stats channel.
    pub async fn send_stats(&self, stats: PurgeStatistics) {
        self.target.send_stats(stats).await;
    }

    /// Set the warning flag to indicate a non-fatal issue occurred.
    pub fn set_warning(&self) {
        self.has_warning.store(true, Ordering::SeqCst);
    }
}
