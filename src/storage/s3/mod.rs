pub mod client_builder;

use anyhow::{Result, anyhow};
use async_channel::Sender;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::types::VersioningConfiguration;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use std::sync::Arc;

use crate::config::{ClientConfig, Config};
use crate::storage::{Storage, StorageFactory, StorageTrait};
use crate::types::error::DecommissionError;
use crate::types::token::WorkflowCancellationToken;
use crate::types::{ObjectRecord, PurgeStatistics, VersioningMode};

/// S3 error codes that indicate a condition worth retrying.
const TRANSIENT_ERROR_CODES: &[&str] = &[
    "SlowDown",
    "InternalError",
    "ServiceUnavailable",
    "RequestTimeout",
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
];

/// Error codes meaning the target key or version is already gone.
const NOT_FOUND_ERROR_CODES: &[&str] = &["NoSuchKey", "NoSuchVersion", "NotFound"];

fn is_transient_code(code: &str) -> bool {
    TRANSIENT_ERROR_CODES.contains(&code)
}

fn is_not_found_code(code: &str) -> bool {
    NOT_FOUND_ERROR_CODES.contains(&code)
}

/// Extracts the S3 error code and message from an AWS SDK error.
///
/// For service errors (S3 API responses), returns the S3 error code
/// (e.g. "NoSuchBucket", "SlowDown") and the human-readable message from
/// the response. For other error types (network, timeout, construction
/// failure), returns "N/A" as the code and the full error description as
/// the message.
fn extract_sdk_error_details<E: std::fmt::Display + ProvideErrorMetadata>(
    e: &SdkError<E>,
) -> (String, String) {
    if let Some(service_err) = e.as_service_error() {
        (
            service_err.code().unwrap_or("unknown").to_string(),
            service_err.message().unwrap_or("no message").to_string(),
        )
    } else {
        ("N/A".to_string(), e.to_string())
    }
}

/// True for failures that never reached the store: the endpoint is
/// unreachable or the connection timed out before a response.
fn is_unreachable_error<E>(e: &SdkError<E>) -> bool {
    matches!(e, SdkError::DispatchFailure(_) | SdkError::TimeoutError(_))
}

fn has_status<E>(e: &SdkError<E>, status: u16) -> bool {
    if let SdkError::ServiceError(ctx) = e {
        return ctx.raw().status().as_u16() == status;
    }
    false
}

fn is_server_error_status<E>(e: &SdkError<E>) -> bool {
    if let SdkError::ServiceError(ctx) = e {
        return ctx.raw().status().as_u16() >= 500;
    }
    false
}

/// Map an AWS SDK error into the decommission error taxonomy.
///
/// Dispatch failures become `Connectivity` (fatal), throttling/5xx-class
/// responses and any `extra_retryable` codes become `TransientStore`
/// (retried by the caller's policy), and everything else is surfaced with
/// the failing API attached as context.
fn classify_sdk_error<E>(
    e: SdkError<E>,
    api: &'static str,
    bucket: &str,
    extra_retryable: &[&str],
) -> anyhow::Error
where
    E: std::fmt::Display + ProvideErrorMetadata,
    SdkError<E>: std::error::Error + Send + Sync + 'static,
{
    let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);

    if is_unreachable_error(&e) {
        tracing::error!(
            bucket = bucket,
            api = api,
            "S3 endpoint unreachable: {}.",
            s3_error_message,
        );
        return anyhow!(DecommissionError::Connectivity(format!(
            "{api} for bucket '{bucket}': {s3_error_message}"
        )));
    }

    if is_transient_code(&s3_error_code)
        || extra_retryable.contains(&s3_error_code.as_str())
        || is_server_error_status(&e)
    {
        tracing::warn!(
            bucket = bucket,
            api = api,
            s3_error_code = s3_error_code,
            s3_error_message = s3_error_message,
            "S3 {} API call failed with a transient error: {} ({}).",
            api,
            s3_error_code,
            s3_error_message,
        );
        return anyhow!(DecommissionError::TransientStore(format!(
            "{api}: {s3_error_code} ({s3_error_message})"
        )));
    }

    tracing::error!(
        bucket = bucket,
        api = api,
        s3_error_code = s3_error_code,
        s3_error_message = s3_error_message,
        "S3 {} API call failed for bucket '{}': {} ({}).",
        api,
        bucket,
        s3_error_code,
        s3_error_message,
    );
    anyhow!(e).context(format!("aws_sdk_s3::client::{api}() failed."))
}

/// Factory for creating S3 storage instances.
pub struct S3StorageFactory;

#[async_trait]
impl StorageFactory for S3StorageFactory {
    async fn create(
        config: Config,
        cancellation_token: WorkflowCancellationToken,
        stats_sender: Sender<PurgeStatistics>,
        client_config: ClientConfig,
    ) -> Storage {
        let client = Arc::new(client_config.create_client().await);

        Box::new(S3Storage {
            bucket: config.target.name.clone(),
            cancellation_token,
            client,
            stats_sender,
        })
    }
}

/// S3 storage implementation for the decommission workflow.
///
/// Provides exactly the operations the workflow needs: the existence
/// probe, versioning reads/writes, the two catalog listings, per-record
/// deletion, and bucket deletion with its absence check.
#[derive(Clone)]
struct S3Storage {
    bucket: String,
    cancellation_token: WorkflowCancellationToken,
    client: Arc<Client>,
    stats_sender: Sender<PurgeStatistics>,
}

#[async_trait]
impl StorageTrait for S3Storage {
    async fn bucket_exists(&self) -> Result<bool> {
        let mut continuation_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_buckets()
                .prefix(&self.bucket)
                .set_continuation_token(continuation_token.clone())
                .send()
                .await
                .map_err(|e| classify_sdk_error(e, "list_buckets", &self.bucket, &[]))?;

            for bucket in output.buckets() {
                if bucket.name() == Some(self.bucket.as_str()) {
                    return Ok(true);
                }
            }

            match output.continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(false)
    }

    async fn get_bucket_versioning(&self) -> Result<VersioningMode> {
        let response = self
            .client
            .get_bucket_versioning()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                // A just-created bucket may not be visible to this call yet.
                classify_sdk_error(
                    e,
                    "get_bucket_versioning",
                    &self.bucket,
                    &["NoSuchBucket"],
                )
            })?;

        Ok(VersioningMode::from_status(response.status()))
    }

    async fn put_bucket_versioning(&self, mode: VersioningMode) -> Result<()> {
        let Some(status) = mode.as_status() else {
            return Err(anyhow!(DecommissionError::InvalidConfig(format!(
                "'{mode}' is not a valid versioning transition target"
            ))));
        };

        let versioning_configuration = VersioningConfiguration::builder().status(status).build();

        self.client
            .put_bucket_versioning()
            .bucket(&self.bucket)
            .versioning_configuration(versioning_configuration)
            .send()
            .await
            .map_err(|e| {
                classify_sdk_error(
                    e,
                    "put_bucket_versioning",
                    &self.bucket,
                    &["NoSuchBucket"],
                )
            })?;

        Ok(())
    }

    async fn list_object_versions(
        &self,
        sender: &Sender<ObjectRecord>,
        max_keys: i32,
    ) -> Result<()> {
        let mut key_marker: Option<String> = None;
        let mut version_id_marker: Option<String> = None;

        loop {
            if self.cancellation_token.is_cancelled() {
                tracing::info!("version listing cancelled.");
                break;
            }

            let output = self
                .client
                .list_object_versions()
                .bucket(&self.bucket)
                .set_key_marker(key_marker.clone())
                .set_version_id_marker(version_id_marker.clone())
                .max_keys(max_keys)
                .send()
                .await
                .map_err(|e| classify_sdk_error(e, "list_object_versions", &self.bucket, &[]))?;

            for version in output.versions() {
                if self.cancellation_token.is_cancelled() {
                    return Ok(());
                }

                let record =
                    ObjectRecord::Version(aws_sdk_s3::types::ObjectVersion::clone(version));
                if sender.send(record).await.is_err() {
                    return if !sender.is_closed() {
                        Err(anyhow!("async_channel::Sender::send() failed."))
                    } else {
                        Ok(())
                    };
                }
            }

            for marker in output.delete_markers() {
                if self.cancellation_token.is_cancelled() {
                    return Ok(());
                }

                let record =
                    ObjectRecord::DeleteMarker(aws_sdk_s3::types::DeleteMarkerEntry::clone(marker));
                if sender.send(record).await.is_err() {
                    return if !sender.is_closed() {
                        Err(anyhow!("async_channel::Sender::send() failed."))
                    } else {
                        Ok(())
                    };
                }
            }

            if output.is_truncated() == Some(true) {
                key_marker = output.next_key_marker().map(String::from);
                version_id_marker = output.next_version_id_marker().map(String::from);
            } else {
                break;
            }
        }

        Ok(())
    }

    async fn list_objects(&self, sender: &Sender<ObjectRecord>, max_keys: i32) -> Result<()> {
        let mut continuation_token: Option<String> = None;

        loop {
            if self.cancellation_token.is_cancelled() {
                tracing::info!("object listing cancelled.");
                break;
            }

            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_continuation_token(continuation_token.clone())
                .max_keys(max_keys)
                .send()
                .await
                .map_err(|e| classify_sdk_error(e, "list_objects_v2", &self.bucket, &[]))?;

            for object in output.contents() {
                if self.cancellation_token.is_cancelled() {
                    return Ok(());
                }

                let record = ObjectRecord::Plain(aws_sdk_s3::types::Object::clone(object));
                if sender.send(record).await.is_err() {
                    return if !sender.is_closed() {
                        Err(anyhow!("async_channel::Sender::send() failed."))
                    } else {
                        Ok(())
                    };
                }
            }

            if output.is_truncated() == Some(true) {
                continuation_token = output.next_continuation_token().map(String::from);
            } else {
                break;
            }
        }

        Ok(())
    }

    async fn delete_object(&self, key: &str, version_id: Option<String>) -> Result<bool> {
        let result = self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .set_version_id(version_id.clone())
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                let (s3_error_code, _) = extract_sdk_error_details(&e);
                if is_not_found_code(&s3_error_code) || has_status(&e, 404) {
                    tracing::debug!(
                        bucket = self.bucket,
                        key = key,
                        version_id = version_id.as_deref().unwrap_or("-"),
                        "object already absent, treating delete as success."
                    );
                    return Ok(false);
                }
                Err(classify_sdk_error(e, "delete_object", &self.bucket, &[]))
            }
        }
    }

    async fn delete_bucket(&self) -> Result<()> {
        let result = self
            .client
            .delete_bucket()
            .bucket(&self.bucket)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);

                // The bucket may have been in a deleting state when we
                // checked its existence; idempotent delete semantics apply.
                if s3_error_code == "NoSuchBucket" {
                    tracing::debug!(
                        bucket = self.bucket,
                        "bucket already absent during delete, treating as success."
                    );
                    return Ok(());
                }

                if is_unreachable_error(&e) {
                    return Err(anyhow!(DecommissionError::Connectivity(format!(
                        "delete_bucket for bucket '{}': {s3_error_message}",
                        self.bucket
                    ))));
                }

                if is_transient_code(&s3_error_code) || is_server_error_status(&e) {
                    tracing::warn!(
                        bucket = self.bucket,
                        s3_error_code = s3_error_code,
                        "S3 DeleteBucket API call failed with a transient error."
                    );
                    return Err(anyhow!(DecommissionError::TransientStore(format!(
                        "delete_bucket: {s3_error_code} ({s3_error_message})"
                    ))));
                }

                tracing::error!(
                    bucket = self.bucket,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 DeleteBucket API call failed for bucket '{}': {} ({}).",
                    self.bucket,
                    s3_error_code,
                    s3_error_message,
                );
                Err(anyhow!(DecommissionError::Deletion(format!(
                    "{s3_error_code}: {s3_error_message}"
                ))))
            }
        }
    }

    async fn head_bucket(&self) -> Result<bool> {
        let result = self.client.head_bucket().bucket(&self.bucket).send().await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                if let Some(service_err) = e.as_service_error() {
                    if service_err.is_not_found() {
                        return Ok(false);
                    }
                }
                if has_status(&e, 404) {
                    return Ok(false);
                }
                Err(classify_sdk_error(e, "head_bucket", &self.bucket, &[]))
            }
        }
    }

    fn get_client(&self) -> Option<Arc<Client>> {
        Some(self.client.clone())
    }

    fn get_stats_sender(&self) -> Sender<PurgeStatistics> {
        self.stats_sender.clone()
    }

    async fn send_stats(&self, stats: PurgeStatistics) {
        let _ = self.stats_sender.send(stats).await;
    }
}
