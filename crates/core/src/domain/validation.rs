use serde::{Deserialize, Serialize};

use crate::domain::workflow::ResultOrigin;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateDocumentRequest {
    pub content: String,
    pub document_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(default = "default_severity")]
    pub severity: String,
    #[serde(alias = "description")]
    pub message: String,
    #[serde(default)]
    pub section: Option<String>,
}

fn default_severity() -> String {
    "info".to_string()
}

/// One-shot compliance report; held for display, never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub compliance_score: f64,
    #[serde(default)]
    pub issues: Vec<ValidationIssue>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl ValidationReport {
    pub fn placeholder(document_type: &str) -> Self {
        Self {
            compliance_score: 0.0,
            issues: vec![ValidationIssue {
                severity: "warning".to_string(),
                message: format!(
                    "validation service unavailable; {document_type} was not checked"
                ),
                section: None,
            }],
            recommendations: vec!["Re-run validation once the service is reachable.".to_string()],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub report: ValidationReport,
    pub origin: ResultOrigin,
}
