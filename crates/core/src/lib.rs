pub mod backend;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod progress;

pub use backend::{
    AssistantBackend, AuthBackend, BackendResult, DocPrepBackend, FormBackend, SubmissionBackend,
};
pub use domain::account::{RegisterRequest, RegisteredAccount};
pub use domain::assistant::{AssistantKind, AssistantReply, AssistantRequest};
pub use domain::document::ExportFormat;
pub use domain::form::{
    AnswerValue, FieldType, FormAnswers, FormDefinition, FormField, FormFields, FormId,
    FormQuestion, PdfFillResult, QuestionId,
};
pub use domain::submission::{
    NewSubmission, Submission, SubmissionId, SubmissionStatus, SubmissionUpdate,
};
pub use domain::validation::{
    ValidateDocumentRequest, ValidationIssue, ValidationOutcome, ValidationReport,
};
pub use domain::workflow::{
    Acknowledgement, AdditionalInfoRequest, ResultOrigin, StartWorkflowRequest,
    StartWorkflowResponse, WorkflowSessionId, WorkflowStatus,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{FlowEngine, WorkflowPhase};
