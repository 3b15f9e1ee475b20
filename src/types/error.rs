use anyhow::Error;
use thiserror::Error;

/// Application-level error taxonomy for s3rb-rs.
///
/// Every store call boundary maps AWS SDK failures into one of these
/// variants so that the retry wrapper and the workflow can make policy
/// decisions without inspecting SDK types.
///
/// Two S3 responses are deliberately *not* errors and never surface here:
/// `NoSuchBucket` on a bucket delete and `NoSuchKey`/404 on an object
/// delete are swallowed as success at the storage layer (idempotent
/// delete semantics).
#[derive(Error, Debug, PartialEq)]
pub enum DecommissionError {
    /// The store endpoint is unreachable. Fatal, never retried.
    #[error("Store endpoint unreachable: {0}")]
    Connectivity(String),

    /// Throttling, 5xx-class responses, or eventual-consistency gaps.
    /// Retried with exponential backoff up to a ceiling, then escalated.
    #[error("Transient store error: {0}")]
    TransientStore(String),

    /// The bucket versioning mode did not converge within the poll budget.
    #[error("Bucket versioning failed to apply within {attempts} poll attempts")]
    ConvergenceTimeout { attempts: u32 },

    /// The bucket still existed when the deletion-confirmation poll budget
    /// was exhausted.
    #[error("Bucket still present after {attempts} poll attempts")]
    DeletionTimeout { attempts: u32 },

    /// Terminal bucket-delete failure (e.g. BucketNotEmpty without force).
    #[error("Bucket deletion failed: {0}")]
    Deletion(String),

    /// Invalid configuration (non-retryable).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation cancelled via the cancellation token.
    #[error("Operation cancelled")]
    Cancelled,
}

impl DecommissionError {
    /// Get the appropriate process exit code for this error.
    ///
    /// For embedding applications (a CLI or an automation runner wrapping
    /// the workflow) that want a stable mapping from failure class to
    /// process exit status. The library itself never calls this.
    ///
    /// - 0: non-error conditions (Cancelled)
    /// - 1: store/workflow errors
    /// - 2: invalid configuration
    pub fn exit_code(&self) -> i32 {
        match self {
            DecommissionError::Cancelled => 0,
            DecommissionError::InvalidConfig(_) => 2,
            _ => 1,
        }
    }

    /// Check if this error is retryable.
    ///
    /// Only transient store errors are retried; connectivity failures and
    /// timeouts are terminal by definition.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DecommissionError::TransientStore(_))
    }
}

/// Check if an anyhow::Error wraps a transient store error.
pub fn is_transient_error(e: &Error) -> bool {
    matches!(
        e.downcast_ref::<DecommissionError>(),
        Some(DecommissionError::TransientStore(_))
    )
}

/// Check if an anyhow::Error wraps a connectivity error.
pub fn is_connectivity_error(e: &Error) -> bool {
    matches!(
        e.downcast_ref::<DecommissionError>(),
        Some(DecommissionError::Connectivity(_))
    )
}

/// Check if an anyhow::Error wraps a cancellation.
pub fn is_cancelled_error(e: &Error) -> bool {
    matches!(
        e.downcast_ref::<DecommissionError>(),
        Some(DecommissionError::Cancelled)
    )
}

/// Extract the exit code from an anyhow::Error, defaulting to 1.
///
/// Companion to [`DecommissionError::exit_code`] for embedding
/// applications that receive the workflow's `anyhow::Error` directly.
pub fn exit_code_from_error(e: &Error) -> i32 {
    if let Some(err) = e.downcast_ref::<DecommissionError>() {
        return err.exit_code();
    }
    1
}
