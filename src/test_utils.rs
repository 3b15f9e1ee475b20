//! Shared test utilities for the s3rb library crate.
//!
//! Provides the canonical tracing initializer, a fast-budget test config,
//! and a scripted in-memory `MockStore` used by the enumerator, purger,
//! versioning, waiter, and workflow test modules.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_channel::Sender;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::types::{DeleteMarkerEntry, Object, ObjectVersion};

use crate::config::Config;
use crate::poll::PollPolicy;
use crate::retry::RetryPolicy;
use crate::storage::StorageTrait;
use crate::types::error::DecommissionError;
use crate::types::{ObjectRecord, PurgeStatistics, VersioningMode};

/// Initialise a dummy tracing subscriber for tests.
///
/// Uses `try_init` so that only the first call in a process actually
/// installs the subscriber; subsequent calls are silently ignored.
pub(crate) fn init_dummy_tracing_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("dummy=trace")
        .try_init();
}

/// Create a [`Config`] with millisecond-scale retry and poll budgets so
/// tests never sleep for real.
pub(crate) fn make_test_config() -> Config {
    let mut config = Config::for_bucket("test-bucket");
    config.store_retry = RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(4),
    };
    config.versioning_poll = PollPolicy {
        interval: Duration::from_millis(1),
        max_attempts: 12,
    };
    config.deletion_wait = PollPolicy {
        interval: Duration::from_millis(1),
        max_attempts: 20,
    };
    config
}

pub(crate) fn version_record(key: &str, version_id: &str) -> ObjectRecord {
    ObjectRecord::Version(
        ObjectVersion::builder()
            .key(key)
            .version_id(version_id)
            .build(),
    )
}

pub(crate) fn marker_record(key: &str, version_id: &str) -> ObjectRecord {
    ObjectRecord::DeleteMarker(
        DeleteMarkerEntry::builder()
            .key(key)
            .version_id(version_id)
            .build(),
    )
}

pub(crate) fn plain_record(key: &str) -> ObjectRecord {
    ObjectRecord::Plain(Object::builder().key(key).build())
}

/// Mutable store state behind the mock.
#[derive(Debug)]
pub(crate) struct MockState {
    pub bucket_present: bool,
    pub versioning: VersioningMode,
    /// A requested transition still propagating: (target, reads remaining
    /// before the read-back reflects it). `u32::MAX` never converges.
    pub pending_transition: Option<(VersioningMode, u32)>,
    /// Versioned catalog (data versions + delete markers).
    pub versioned_records: Vec<ObjectRecord>,
    /// Plain-object catalog.
    pub plain_records: Vec<ObjectRecord>,
    /// Head calls that still report the bucket present after a successful
    /// delete (eventual-consistency lag).
    pub head_lag_after_delete: u32,
    /// Scripted transient failures consumed by the next delete_object calls.
    pub delete_object_transient_failures: u32,
    /// Scripted errors returned by bucket_exists, consumed in order.
    pub bucket_exists_errors: VecDeque<DecommissionError>,
}

impl Default for MockState {
    fn default() -> Self {
        MockState {
            bucket_present: true,
            versioning: VersioningMode::Unset,
            pending_transition: None,
            versioned_records: Vec::new(),
            plain_records: Vec::new(),
            head_lag_after_delete: 0,
            delete_object_transient_failures: 0,
            bucket_exists_errors: VecDeque::new(),
        }
    }
}

/// Per-operation call counters.
#[derive(Debug, Default)]
pub(crate) struct MockCalls {
    pub bucket_exists: AtomicU32,
    pub get_versioning: AtomicU32,
    pub put_versioning: AtomicU32,
    pub list_versions: AtomicU32,
    pub list_objects: AtomicU32,
    pub delete_object: AtomicU32,
    pub delete_bucket: AtomicU32,
    pub head_bucket: AtomicU32,
}

impl MockCalls {
    pub fn count(&self, counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }
}

/// Scripted in-memory store honoring the [`StorageTrait`] contract,
/// including the idempotent-delete semantics (absent key or bucket on
/// delete is success).
#[derive(Clone)]
pub(crate) struct MockStore {
    pub state: Arc<Mutex<MockState>>,
    pub calls: Arc<MockCalls>,
    stats_sender: Sender<PurgeStatistics>,
}

impl MockStore {
    pub fn new(state: MockState, stats_sender: Sender<PurgeStatistics>) -> Self {
        MockStore {
            state: Arc::new(Mutex::new(state)),
            calls: Arc::new(MockCalls::default()),
            stats_sender,
        }
    }

    pub fn with_defaults() -> (Self, async_channel::Receiver<PurgeStatistics>) {
        let (stats_sender, stats_receiver) = async_channel::unbounded();
        (MockStore::new(MockState::default(), stats_sender), stats_receiver)
    }

    pub fn remaining_records(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.versioned_records.len() + state.plain_records.len()
    }
}

#[async_trait]
impl StorageTrait for MockStore {
    async fn bucket_exists(&self) -> Result<bool> {
        self.calls.bucket_exists.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.bucket_exists_errors.pop_front() {
            return Err(anyhow!(err));
        }
        Ok(state.bucket_present)
    }

    async fn get_bucket_versioning(&self) -> Result<VersioningMode> {
        self.calls.get_versioning.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if let Some((target, remaining)) = state.pending_transition {
            if remaining == 0 {
                state.versioning = target;
                state.pending_transition = None;
            } else if remaining != u32::MAX {
                state.pending_transition = Some((target, remaining - 1));
            }
        }
        Ok(state.versioning)
    }

    async fn put_bucket_versioning(&self, mode: VersioningMode) -> Result<()> {
        self.calls.put_versioning.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let lag = match state.pending_transition {
            Some((_, lag)) => lag,
            None => 0,
        };
        state.pending_transition = Some((mode, lag));
        Ok(())
    }

    async fn list_object_versions(
        &self,
        sender: &Sender<ObjectRecord>,
        _max_keys: i32,
    ) -> Result<()> {
        self.calls.list_versions.fetch_add(1, Ordering::SeqCst);
        let records = self.state.lock().unwrap().versioned_records.clone();
        for record in records {
            sender.send(record).await?;
        }
        Ok(())
    }

    async fn list_objects(&self, sender: &Sender<ObjectRecord>, _max_keys: i32) -> Result<()> {
        self.calls.list_objects.fetch_add(1, Ordering::SeqCst);
        let records = self.state.lock().unwrap().plain_records.clone();
        for record in records {
            sender.send(record).await?;
        }
        Ok(())
    }

    async fn delete_object(&self, key: &str, version_id: Option<String>) -> Result<bool> {
        self.calls.delete_object.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();

        if state.delete_object_transient_failures > 0 {
            state.delete_object_transient_failures -= 1;
            return Err(anyhow!(DecommissionError::TransientStore(
                "SlowDown".to_string()
            )));
        }

        let matches = |record: &ObjectRecord| {
            record.key() == key && record.version_id() == version_id.as_deref()
        };
        let before = state.versioned_records.len() + state.plain_records.len();
        state.versioned_records.retain(|r| !matches(r));
        state.plain_records.retain(|r| !matches(r));
        let after = state.versioned_records.len() + state.plain_records.len();
        // Absent (key, version) pairs are success by contract.
        Ok(after < before)
    }

    async fn delete_bucket(&self) -> Result<()> {
        self.calls.delete_bucket.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();

        if !state.bucket_present {
            // NoSuchBucket is swallowed as success by contract.
            return Ok(());
        }
        if !state.versioned_records.is_empty() || !state.plain_records.is_empty() {
            return Err(anyhow!(DecommissionError::Deletion(
                "BucketNotEmpty: The bucket you tried to delete is not empty".to_string()
            )));
        }
        state.bucket_present = false;
        Ok(())
    }

    async fn head_bucket(&self) -> Result<bool> {
        self.calls.head_bucket.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if !state.bucket_present && state.head_lag_after_delete > 0 {
            state.head_lag_after_delete -= 1;
            return Ok(true);
        }
        Ok(state.bucket_present)
    }

    fn get_client(&self) -> Option<Arc<Client>> {
        None
    }

    fn get_stats_sender(&self) -> Sender<PurgeStatistics> {
        self.stats_sender.clone()
    }

    async fn send_stats(&self, stats: PurgeStatistics) {
        let _ = self.stats_sender.send(stats).await;
    }
}
