use std::fmt;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::models::item::ExtractedItem;

/// Opaque job identifier assigned by the backend on submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle position of a job as seen by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Idle,
    Uploading,
    Processing,
    Items,
    Posting,
    Posted,
    Failed,
    TimedOut,
    Cancelled,
}

impl JobStatus {
    /// Terminal states only accept `reset`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Posted | JobStatus::Failed | JobStatus::TimedOut | JobStatus::Cancelled
        )
    }
}

/// Body of `GET /jobs/{job_id}/status`.
///
/// The variant is selected by the `status` field. Any status string outside
/// the three known values fails to deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusPayload {
    Processing {
        #[serde(default)]
        progress: u8,
    },
    Completed {
        #[serde(default = "full_progress")]
        progress: u8,
        items: Vec<ExtractedItem>,
    },
    Failed {
        #[serde(default)]
        progress: u8,
        error: String,
    },
}

fn full_progress() -> u8 {
    100
}

impl StatusPayload {
    pub fn progress(&self) -> u8 {
        match self {
            StatusPayload::Processing { progress }
            | StatusPayload::Completed { progress, .. }
            | StatusPayload::Failed { progress, .. } => *progress,
        }
    }
}

/// Body of a successful `POST /jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: JobId,
}

/// Error body returned by the backend on non-success responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_processing_status() {
        let payload: StatusPayload =
            serde_json::from_str(r#"{"status":"processing","progress":30,"items":[]}"#).unwrap();
        assert_eq!(payload, StatusPayload::Processing { progress: 30 });
    }

    #[test]
    fn parses_completed_status_with_items() {
        let json = r#"{
            "status": "completed",
            "progress": 100,
            "items": [{
                "name": "Desk lamp",
                "category": "home",
                "condition": "good",
                "estimated_price": 18.5,
                "confidence": 0.82,
                "timestamp": 4.2
            }]
        }"#;
        let payload: StatusPayload = serde_json::from_str(json).unwrap();
        match payload {
            StatusPayload::Completed { progress, items } => {
                assert_eq!(progress, 100);
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].name, "Desk lamp");
                assert_eq!(items[0].confidence, Some(0.82));
                assert!(items[0].frame_data.is_none());
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn failed_status_requires_error() {
        let missing = serde_json::from_str::<StatusPayload>(r#"{"status":"failed","progress":60}"#);
        assert!(missing.is_err());

        let payload: StatusPayload =
            serde_json::from_str(r#"{"status":"failed","progress":60,"error":"decoder crashed"}"#)
                .unwrap();
        assert_eq!(
            payload,
            StatusPayload::Failed {
                progress: 60,
                error: "decoder crashed".to_string()
            }
        );
    }

    #[test]
    fn rejects_unknown_status() {
        let result = serde_json::from_str::<StatusPayload>(r#"{"status":"queued","progress":0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_negative_progress() {
        let result = serde_json::from_str::<StatusPayload>(r#"{"status":"processing","progress":-5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn status_display_is_snake_case() {
        assert_eq!(JobStatus::TimedOut.to_string(), "timed_out");
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Items.is_terminal());
    }
}
