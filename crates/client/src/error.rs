use regpilot_core::ApplicationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base url `{0}`")]
    InvalidBaseUrl(String),
    #[error("http transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{path} returned HTTP {status}: {body}")]
    Status { path: String, status: u16, body: String },
    #[error("{path} was not authorized and the session could not be refreshed")]
    Unauthorized { path: String },
    #[error("could not decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not encode request body: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }
}

impl From<ClientError> for ApplicationError {
    fn from(value: ClientError) -> Self {
        match value {
            ClientError::InvalidBaseUrl(url) => {
                ApplicationError::Configuration(format!("invalid base url `{url}`"))
            }
            ClientError::Transport(error) => ApplicationError::Transport(error.to_string()),
            ClientError::Status { status, body, path } => ApplicationError::HttpStatus {
                status,
                message: if body.trim().is_empty() { path } else { body },
            },
            ClientError::Unauthorized { .. } => ApplicationError::Unauthorized,
            ClientError::Decode { path, source } => {
                ApplicationError::Decode(format!("{path}: {source}"))
            }
            ClientError::Encode(source) => ApplicationError::Decode(source.to_string()),
        }
    }
}
