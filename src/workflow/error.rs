use crate::models::item::FieldError;
use crate::models::job::JobStatus;
use crate::services::job_client::ClientError;
use crate::services::poller::PollError;
use crate::workflow::result_set::IndexOutOfRange;

/// Errors surfaced by [`JobController`](crate::workflow::JobController).
///
/// Whether a failure is fatal for the job shows in the controller's state,
/// not in this type: a rejected edit leaves the state at `Items`, a failed
/// upload moves it to `Failed`.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Backend unreachable: {0}")]
    Transport(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Job is not in a mutable state: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storefront credentials rejected: {0}")]
    Auth(String),

    #[error("Upload failed: {0}")]
    Submission(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("A job is already in flight")]
    AlreadyPolling,

    #[error("Cannot {operation} while the job is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: JobStatus,
    },
}

impl From<ClientError> for WorkflowError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Transport(message) => WorkflowError::Transport(message),
            ClientError::Timeout(message) => WorkflowError::Timeout(message),
            ClientError::Submission(message) => WorkflowError::Submission(message),
            ClientError::NotFound(message) => WorkflowError::NotFound(message),
            ClientError::Conflict(message) => WorkflowError::Conflict(message),
            ClientError::Validation(message) => WorkflowError::Validation(message),
            ClientError::Auth(message) => WorkflowError::Auth(message),
            ClientError::Publish(message) => WorkflowError::Publish(message),
            ClientError::Decode(e) => WorkflowError::Transport(format!("malformed response: {e}")),
            ClientError::Status { status, message } => {
                WorkflowError::Transport(format!("HTTP {status}: {message}"))
            }
        }
    }
}

impl From<PollError> for WorkflowError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::AlreadyPolling(_) => WorkflowError::AlreadyPolling,
            PollError::InvalidSettings(_) => WorkflowError::Validation(err.to_string()),
        }
    }
}

impl From<IndexOutOfRange> for WorkflowError {
    fn from(err: IndexOutOfRange) -> Self {
        WorkflowError::Validation(err.to_string())
    }
}

impl From<FieldError> for WorkflowError {
    fn from(err: FieldError) -> Self {
        WorkflowError::Validation(err.to_string())
    }
}

impl From<garde::Report> for WorkflowError {
    fn from(report: garde::Report) -> Self {
        WorkflowError::Validation(report.to_string())
    }
}
