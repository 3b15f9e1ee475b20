use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::poll::PollPolicy;
use crate::retry::RetryPolicy;
use crate::types::error::DecommissionError;
use crate::types::{BucketIdentity, ClientConfigLocation, S3Credentials};

/// Versioning-convergence poll: 12 attempts spaced 5 seconds apart.
pub const DEFAULT_VERSIONING_POLL: PollPolicy = PollPolicy {
    interval: Duration::from_secs(5),
    max_attempts: 12,
};

/// Bucket-absence poll: the store's own `bucket_not_exists` waiter
/// parameters (5 second delay, 20 attempts).
pub const DEFAULT_DELETION_WAIT: PollPolicy = PollPolicy {
    interval: Duration::from_secs(5),
    max_attempts: 20,
};

/// Main configuration for a decommission run.
///
/// Holds the bucket identity, the `force` flag, AWS client settings, and
/// the retry/poll budgets. One `Config` drives exactly one bucket
/// end-to-end; no state is shared between runs.
///
/// # Quick start
///
/// Use [`Config::for_bucket`] for a minimal configuration with production
/// defaults:
///
/// ```
/// use s3rb_rs::Config;
///
/// let mut config = Config::for_bucket("my-bucket");
/// config.force = true;
/// assert_eq!(config.versioning_poll.max_attempts, 12);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub target: BucketIdentity,
    /// Only `force = true` permits deleting a non-empty bucket; without it
    /// the store's "bucket must be empty" rule applies and the delete
    /// failure is surfaced.
    pub force: bool,
    pub target_client_config: Option<ClientConfig>,
    /// Application-level retry policy applied at each store-call boundary.
    pub store_retry: RetryPolicy,
    /// Bounded poll for versioning-mode convergence.
    pub versioning_poll: PollPolicy,
    /// Bounded poll confirming the bucket no longer exists after deletion.
    pub deletion_wait: PollPolicy,
    /// Page size for the two listings. Per-page batch sizes remain
    /// store-determined; this is only an upper bound hint.
    pub max_keys: i32,
    /// Capacity of the channel between the enumerator and the purgers.
    pub purge_queue_size: usize,
    /// Number of concurrent purge workers. The default of 1 gives strictly
    /// sequential deletions; higher values use a bounded worker pool. The
    /// final bucket-delete always waits for every worker to finish.
    pub purge_worker_size: u16,
}

impl Config {
    /// Create a `Config` for the given bucket with production defaults.
    pub fn for_bucket(bucket: &str) -> Self {
        Config {
            target: BucketIdentity {
                name: bucket.to_string(),
                region: None,
            },
            ..Config::default()
        }
    }

    /// Validate the configuration before running a workflow.
    pub fn validate(&self) -> Result<()> {
        if self.target.name.is_empty() {
            return Err(anyhow!(DecommissionError::InvalidConfig(
                "bucket name must not be empty".to_string()
            )));
        }
        if self.purge_worker_size == 0 {
            return Err(anyhow!(DecommissionError::InvalidConfig(
                "purge_worker_size must be at least 1".to_string()
            )));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            target: BucketIdentity {
                name: String::new(),
                region: None,
            },
            force: false,
            target_client_config: None,
            store_retry: RetryPolicy::default(),
            versioning_poll: DEFAULT_VERSIONING_POLL,
            deletion_wait: DEFAULT_DELETION_WAIT,
            max_keys: 1000,
            purge_queue_size: 10_000,
            purge_worker_size: 1,
        }
    }
}

/// AWS S3 client configuration: credential source, region, endpoint, and
/// SDK-level retry settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_config_location: ClientConfigLocation,
    pub credential: S3Credentials,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub retry_config: SdkRetryConfig,
}

impl Default for ClientConfig {
    /// Environment-chain credentials, default region resolution, no
    /// endpoint override. This is what a bare [`Config::for_bucket`]
    /// run uses.
    fn default() -> Self {
        ClientConfig {
            client_config_location: ClientConfigLocation::default(),
            credential: S3Credentials::FromEnvironment,
            region: None,
            endpoint_url: None,
            force_path_style: false,
            retry_config: SdkRetryConfig::default(),
        }
    }
}

/// Retry configuration handed to the AWS SDK itself.
///
/// This is the SDK's built-in transport-level retry; the application-level
/// [`RetryPolicy`] sits above it and handles the taxonomy-aware retries.
#[derive(Debug, Clone)]
pub struct SdkRetryConfig {
    pub aws_max_attempts: u32,
    pub initial_backoff_milliseconds: u64,
}

impl Default for SdkRetryConfig {
    fn default() -> Self {
        SdkRetryConfig {
            aws_max_attempts: 3,
            initial_backoff_milliseconds: 100,
        }
    }
}
