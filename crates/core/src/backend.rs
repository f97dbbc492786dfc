//! Ports to the remote regulatory-submission backend.
//!
//! Controllers only ever talk to these traits. The HTTP implementation lives in
//! `regpilot-client`; tests substitute in-memory fakes.

use async_trait::async_trait;

use crate::domain::account::{RegisterRequest, RegisteredAccount};
use crate::domain::assistant::{AssistantReply, AssistantRequest};
use crate::domain::form::{
    FormAnswers, FormDefinition, FormId, FormQuestion, PdfFillResult, QuestionId,
};
use crate::domain::submission::{NewSubmission, Submission, SubmissionId, SubmissionUpdate};
use crate::domain::validation::{ValidateDocumentRequest, ValidationReport};
use crate::domain::workflow::{
    Acknowledgement, AdditionalInfoRequest, StartWorkflowRequest, StartWorkflowResponse,
    WorkflowSessionId, WorkflowStatus,
};
use crate::errors::ApplicationError;

pub type BackendResult<T> = Result<T, ApplicationError>;

#[async_trait]
pub trait SubmissionBackend: Send + Sync {
    async fn list_submissions(&self, user_id: Option<&str>) -> BackendResult<Vec<Submission>>;
    async fn get_submission(&self, id: &SubmissionId) -> BackendResult<Submission>;
    async fn create_submission(&self, submission: &NewSubmission) -> BackendResult<Submission>;
    async fn update_submission(
        &self,
        id: &SubmissionId,
        update: &SubmissionUpdate,
    ) -> BackendResult<Submission>;
    async fn delete_submission(&self, id: &SubmissionId) -> BackendResult<()>;
}

#[async_trait]
pub trait FormBackend: Send + Sync {
    async fn form_by_name(&self, form_type: &str) -> BackendResult<FormDefinition>;
    async fn form_questions(&self, form_id: &FormId) -> BackendResult<Vec<FormQuestion>>;
    async fn form_answers(
        &self,
        submission: &SubmissionId,
        question: &QuestionId,
    ) -> BackendResult<FormAnswers>;
    async fn save_form_answers(
        &self,
        submission: &SubmissionId,
        question: &QuestionId,
        answers: &FormAnswers,
    ) -> BackendResult<()>;
    async fn fill_pdf(&self, submission: &SubmissionId) -> BackendResult<PdfFillResult>;
}

#[async_trait]
pub trait DocPrepBackend: Send + Sync {
    async fn start_workflow(
        &self,
        request: &StartWorkflowRequest,
    ) -> BackendResult<StartWorkflowResponse>;
    async fn workflow_status(&self, session: &WorkflowSessionId) -> BackendResult<WorkflowStatus>;
    async fn submit_additional_info(
        &self,
        request: &AdditionalInfoRequest,
    ) -> BackendResult<Acknowledgement>;
    async fn validate_document(
        &self,
        request: &ValidateDocumentRequest,
    ) -> BackendResult<ValidationReport>;
}

#[async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn generate(&self, request: &AssistantRequest) -> BackendResult<AssistantReply>;
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> BackendResult<RegisteredAccount>;
    async fn refresh(&self) -> BackendResult<()>;
}
