use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Client-generated identifier of one document-generation run.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowSessionId(pub String);

impl WorkflowSessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for WorkflowSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartWorkflowRequest {
    pub session_id: WorkflowSessionId,
    pub document_type: String,
    pub attachment_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartWorkflowResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<WorkflowSessionId>,
}

/// Status payload returned by the workflow-status endpoint, tagged on `status`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkflowStatus {
    Processing {
        #[serde(default)]
        message: Option<String>,
    },
    AwaitingUserInput {
        #[serde(default)]
        additional_questions: Vec<String>,
    },
    Completed {
        final_document: String,
    },
    Error {
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Error { .. })
    }

    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Error { error, message } => Some(
                error
                    .clone()
                    .or_else(|| message.clone())
                    .unwrap_or_else(|| "workflow reported an unspecified error".to_string()),
            ),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalInfoRequest {
    pub session_id: WorkflowSessionId,
    /// Keyed by the question text as presented by the backend.
    pub answers: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Whether a value came from the backend or from the configured fallback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrigin {
    #[default]
    Backend,
    Fallback,
}

#[cfg(test)]
mod tests {
    use super::{WorkflowSessionId, WorkflowStatus};

    #[test]
    fn status_variants_decode_from_tagged_payloads() {
        let awaiting: WorkflowStatus = serde_json::from_str(
            r#"{"status":"awaiting_user_input","additional_questions":["Q1","Q2"]}"#,
        )
        .expect("awaiting payload");
        assert_eq!(
            awaiting,
            WorkflowStatus::AwaitingUserInput {
                additional_questions: vec!["Q1".to_string(), "Q2".to_string()]
            }
        );

        let completed: WorkflowStatus =
            serde_json::from_str(r##"{"status":"completed","final_document":"# Title\nBody"}"##)
                .expect("completed payload");
        assert!(completed.is_terminal());

        let processing: WorkflowStatus =
            serde_json::from_str(r#"{"status":"processing","progress":40}"#)
                .expect("processing payload ignores unknown fields");
        assert!(!processing.is_terminal());
    }

    #[test]
    fn unknown_status_is_rejected() {
        let result = serde_json::from_str::<WorkflowStatus>(r#"{"status":"sleeping"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn completed_without_document_is_rejected() {
        let result = serde_json::from_str::<WorkflowStatus>(r#"{"status":"completed"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn error_message_prefers_error_field() {
        let status = WorkflowStatus::Error {
            error: Some("model timeout".to_string()),
            message: Some("ignored".to_string()),
        };
        assert_eq!(status.error_message().as_deref(), Some("model timeout"));
        assert!(WorkflowStatus::Error { error: None, message: None }.error_message().is_some());
    }

    #[test]
    fn generated_session_ids_are_unique() {
        assert_ne!(WorkflowSessionId::generate(), WorkflowSessionId::generate());
    }
}
