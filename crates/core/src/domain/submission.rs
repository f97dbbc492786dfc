use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::form::FormId;
use crate::domain::string_or_number;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(#[serde(deserialize_with = "string_or_number")] pub String);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Draft,
    InProgress,
    Completed,
}

impl SubmissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Status implied by a freshly computed progress value.
    pub fn for_progress(progress: u8) -> Self {
        if progress >= 100 {
            Self::Completed
        } else {
            Self::InProgress
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub name: String,
    pub product_type: String,
    pub submission_type: String,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub form_id: Option<FormId>,
}

impl Submission {
    /// Deletion is only offered for drafts.
    pub fn can_delete(&self) -> bool {
        self.status == SubmissionStatus::Draft
    }

    pub fn ensure_deletable(&self) -> Result<(), DomainError> {
        if self.can_delete() {
            return Ok(());
        }

        Err(DomainError::SubmissionNotDeletable { id: self.id.clone(), status: self.status })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubmission {
    pub name: String,
    pub product_type: String,
    pub submission_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SubmissionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SubmissionUpdate {
    pub fn progress(progress: u8) -> Self {
        Self {
            status: Some(SubmissionStatus::for_progress(progress)),
            progress: Some(progress),
            name: None,
        }
    }
}
