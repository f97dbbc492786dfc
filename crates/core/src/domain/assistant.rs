use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// AI-assisted content generators exposed by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantKind {
    FormQuestions,
    SuggestedForm,
    PreSubmission,
    PostMarketSurveillance,
}

impl AssistantKind {
    /// Only the pre-submission and post-market generators take a `type` query parameter.
    pub fn requires_report_type(self) -> bool {
        matches!(self, Self::PreSubmission | Self::PostMarketSurveillance)
    }
}

impl FromStr for AssistantKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "form-questions" => Ok(Self::FormQuestions),
            "suggested-form" => Ok(Self::SuggestedForm),
            "pre-submission" => Ok(Self::PreSubmission),
            "post-market" | "post-market-surveillance" => Ok(Self::PostMarketSurveillance),
            other => Err(DomainError::InvariantViolation(format!(
                "unsupported assistant `{other}` (expected form-questions|suggested-form|pre-submission|post-market)"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssistantRequest {
    pub kind: AssistantKind,
    pub report_type: Option<String>,
    pub payload: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssistantReply {
    Text {
        #[serde(alias = "response", alias = "result", alias = "analysis")]
        content: String,
    },
    Structured(serde_json::Value),
}

impl AssistantReply {
    /// Markdown-ish text suitable for the export service.
    pub fn to_markdown(&self) -> String {
        match self {
            Self::Text { content } => content.clone(),
            Self::Structured(value) => {
                let pretty =
                    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
                format!("```json\n{pretty}\n```")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AssistantKind, AssistantReply};

    #[test]
    fn kind_parses_cli_spellings() {
        assert_eq!(
            "post_market".parse::<AssistantKind>().ok(),
            Some(AssistantKind::PostMarketSurveillance)
        );
        assert_eq!(
            "Suggested-Form".parse::<AssistantKind>().ok(),
            Some(AssistantKind::SuggestedForm)
        );
        assert!("weather".parse::<AssistantKind>().is_err());
        assert!(AssistantKind::PreSubmission.requires_report_type());
        assert!(!AssistantKind::FormQuestions.requires_report_type());
    }

    #[test]
    fn reply_accepts_text_aliases_and_structured_bodies() {
        let text: AssistantReply =
            serde_json::from_str(r###"{"response": "## Summary"}"###).expect("text reply");
        assert_eq!(text.to_markdown(), "## Summary");

        let structured: AssistantReply =
            serde_json::from_str(r#"{"questions": ["a", "b"]}"#).expect("structured reply");
        assert!(structured.to_markdown().starts_with("```json"));
    }
}
