use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Downloadable artifact formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Pdf,
    Doc,
    Txt,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Txt => "txt",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Doc => "application/msword",
            Self::Txt => "text/plain;charset=utf-8",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "doc" | "word" => Ok(Self::Doc),
            "txt" | "text" => Ok(Self::Txt),
            other => Err(DomainError::InvariantViolation(format!(
                "unsupported export format `{other}` (expected pdf|doc|txt)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ExportFormat;

    #[test]
    fn formats_parse_and_describe_themselves() {
        assert_eq!("PDF".parse::<ExportFormat>().ok(), Some(ExportFormat::Pdf));
        assert_eq!("word".parse::<ExportFormat>().ok(), Some(ExportFormat::Doc));
        assert!("docx".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Doc.mime_type(), "application/msword");
        assert_eq!(ExportFormat::Txt.to_string(), "txt");
    }
}
