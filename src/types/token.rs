/// A cancellation token used to abort a running decommission workflow.
///
/// This is a type alias for [`tokio_util::sync::CancellationToken`]. Pass the
/// token to [`DecommissionWorkflow::new`](crate::workflow::DecommissionWorkflow::new)
/// and call [`cancel()`](tokio_util::sync::CancellationToken::cancel) on it to
/// request graceful shutdown (e.g., in a Ctrl+C handler). Cancellation is
/// honored at every poll iteration and every listing page boundary.
pub type WorkflowCancellationToken = tokio_util::sync::CancellationToken;

/// Create a new [`WorkflowCancellationToken`].
///
/// # Example
///
/// ```
/// use s3rb_rs::create_workflow_cancellation_token;
///
/// let token = create_workflow_cancellation_token();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
pub fn create_workflow_cancellation_token() -> WorkflowCancellationToken {
    tokio_util::sync::CancellationToken::new()
}
