use thiserror::Error;

use crate::domain::submission::{SubmissionId, SubmissionStatus};
use crate::flows::FlowTransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("submission {id} cannot be deleted while {status:?}; only drafts are deletable")]
    SubmissionNotDeletable { id: SubmissionId, status: SubmissionStatus },
    #[error("required fields are missing: {fields:?}")]
    MissingRequiredFields { fields: Vec<String> },
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("backend returned HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },
    #[error("request was not authorized and the session could not be refreshed")]
    Unauthorized,
    #[error("backend reported failure: {0}")]
    Backend(String),
    #[error("could not decode backend response: {0}")]
    Decode(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("export failed: {0}")]
    Export(String),
}

impl ApplicationError {
    /// Short machine-readable class used by command output.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::MissingRequiredFields { .. }) => "validation",
            Self::Domain(_) => "domain",
            Self::Transport(_) => "transport",
            Self::HttpStatus { .. } => "http_status",
            Self::Unauthorized => "unauthorized",
            Self::Backend(_) => "backend",
            Self::Decode(_) => "decode",
            Self::Configuration(_) => "configuration",
            Self::Export(_) => "export",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not authorized: {message}")]
    NotAuthorized { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "The submission data was rejected. Review your entries.",
            Self::NotAuthorized { .. } => "Your session has expired. Please sign in again.",
            Self::ServiceUnavailable { .. } => "The regulatory backend is unreachable right now.",
            Self::Internal { .. } => "Something went wrong on this machine.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotAuthorized { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = || "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::Unauthorized => Self::NotAuthorized {
                message: "session refresh failed".to_owned(),
                correlation_id: unassigned(),
            },
            ApplicationError::HttpStatus { status, message } if (400..500).contains(&status) => {
                Self::BadRequest { message, correlation_id: unassigned() }
            }
            ApplicationError::Transport(message)
            | ApplicationError::Backend(message)
            | ApplicationError::HttpStatus { message, .. } => {
                Self::ServiceUnavailable { message, correlation_id: unassigned() }
            }
            ApplicationError::Decode(message)
            | ApplicationError::Configuration(message)
            | ApplicationError::Export(message) => {
                Self::Internal { message, correlation_id: unassigned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::submission::{SubmissionId, SubmissionStatus};
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn domain_error_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(DomainError::MissingRequiredFields {
            fields: vec!["device_name".to_owned()],
        })
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(interface.user_message(), "The submission data was rejected. Review your entries.");
    }

    #[test]
    fn transport_and_backend_failures_map_to_service_unavailable() {
        let transport = ApplicationError::Transport("connection reset".to_owned())
            .into_interface("req-2");
        let backend =
            ApplicationError::Backend("workflow rejected".to_owned()).into_interface("req-3");

        assert!(matches!(transport, InterfaceError::ServiceUnavailable { .. }));
        assert!(matches!(backend, InterfaceError::ServiceUnavailable { .. }));
    }

    #[test]
    fn client_side_http_status_maps_to_bad_request() {
        let interface =
            ApplicationError::HttpStatus { status: 422, message: "bad form".to_owned() }
                .into_interface("req-4");
        assert!(matches!(interface, InterfaceError::BadRequest { .. }));

        let server =
            ApplicationError::HttpStatus { status: 503, message: "down".to_owned() }
                .into_interface("req-5");
        assert!(matches!(server, InterfaceError::ServiceUnavailable { .. }));
    }

    #[test]
    fn unauthorized_asks_user_to_sign_in() {
        let interface = ApplicationError::Unauthorized.into_interface("req-6");
        assert_eq!(interface.user_message(), "Your session has expired. Please sign in again.");
    }

    #[test]
    fn error_classes_are_stable() {
        let not_deletable = ApplicationError::from(DomainError::SubmissionNotDeletable {
            id: SubmissionId("s-1".to_owned()),
            status: SubmissionStatus::Completed,
        });
        assert_eq!(not_deletable.class(), "domain");
        assert_eq!(
            ApplicationError::from(DomainError::MissingRequiredFields { fields: Vec::new() })
                .class(),
            "validation"
        );
        assert_eq!(ApplicationError::Decode("x".to_owned()).class(), "decode");
    }
}
