use crate::models::job::{JobId, JobStatus};
use crate::models::storefront::Storefront;
use crate::workflow::result_set::ResultSet;

/// Lifecycle of one sell workflow session.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Idle,
    Uploading,
    Processing {
        job_id: JobId,
        progress: u8,
    },
    Items {
        job_id: JobId,
        items: ResultSet,
    },
    Posting {
        job_id: JobId,
        items: ResultSet,
    },
    Posted {
        job_id: JobId,
        storefront: Storefront,
    },
    Failed {
        job_id: Option<JobId>,
        error: String,
    },
    TimedOut {
        job_id: Option<JobId>,
        error: String,
    },
    Cancelled {
        job_id: JobId,
    },
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Idle => JobStatus::Idle,
            JobState::Uploading => JobStatus::Uploading,
            JobState::Processing { .. } => JobStatus::Processing,
            JobState::Items { .. } => JobStatus::Items,
            JobState::Posting { .. } => JobStatus::Posting,
            JobState::Posted { .. } => JobStatus::Posted,
            JobState::Failed { .. } => JobStatus::Failed,
            JobState::TimedOut { .. } => JobStatus::TimedOut,
            JobState::Cancelled { .. } => JobStatus::Cancelled,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            JobState::Idle | JobState::Uploading => None,
            JobState::Processing { job_id, .. }
            | JobState::Items { job_id, .. }
            | JobState::Posting { job_id, .. }
            | JobState::Posted { job_id, .. }
            | JobState::Cancelled { job_id } => Some(job_id),
            JobState::Failed { job_id, .. } | JobState::TimedOut { job_id, .. } => job_id.as_ref(),
        }
    }

    pub fn progress(&self) -> Option<u8> {
        match self {
            JobState::Processing { progress, .. } => Some(*progress),
            JobState::Items { .. } | JobState::Posting { .. } | JobState::Posted { .. } => Some(100),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&ResultSet> {
        match self {
            JobState::Items { items, .. } | JobState::Posting { items, .. } => Some(items),
            _ => None,
        }
    }

    pub fn storefront(&self) -> Option<&Storefront> {
        match self {
            JobState::Posted { storefront, .. } => Some(storefront),
            _ => None,
        }
    }

    /// Human-readable reason of a fatal state.
    pub fn error(&self) -> Option<&str> {
        match self {
            JobState::Failed { error, .. } | JobState::TimedOut { error, .. } => Some(error),
            JobState::Cancelled { .. } => Some("Processing cancelled"),
            _ => None,
        }
    }
}
