use std::sync::Arc;

use async_trait::async_trait;
use regpilot_core::backend::{
    AssistantBackend, BackendResult, DocPrepBackend, FormBackend, SubmissionBackend,
};
use regpilot_core::{
    Acknowledgement, AdditionalInfoRequest, AssistantKind, AssistantReply, AssistantRequest,
    FormAnswers, FormDefinition, FormId, FormQuestion, NewSubmission, PdfFillResult, QuestionId,
    StartWorkflowRequest, StartWorkflowResponse, Submission, SubmissionId, SubmissionUpdate,
    ValidateDocumentRequest, ValidationReport, WorkflowSessionId, WorkflowStatus,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ClientError;
use crate::http::{ApiClient, ApiRequest};

/// Backend ports implemented over the JSON/HTTP surface.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Arc<ApiClient>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListEnvelope<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "applications", alias = "questions", alias = "items")]
        data: Vec<T>,
    },
}

impl<T> ListEnvelope<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Wrapped { data: items } => items,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnswersEnvelope {
    Wrapped { answers: FormAnswers },
    Bare(FormAnswers),
}

#[derive(Serialize)]
struct SaveAnswersBody<'a> {
    answers: &'a FormAnswers,
}

impl HttpBackend {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }
}

fn assistant_path(kind: AssistantKind) -> &'static str {
    match kind {
        AssistantKind::FormQuestions => "/agent/form_questions",
        AssistantKind::SuggestedForm => "/agent/suggested_form",
        AssistantKind::PreSubmission => "/agent/pre_submission",
        AssistantKind::PostMarketSurveillance => "/agent/post_market_surveillance/analyze",
    }
}

#[async_trait]
impl SubmissionBackend for HttpBackend {
    async fn list_submissions(&self, user_id: Option<&str>) -> BackendResult<Vec<Submission>> {
        let mut request = ApiRequest::get("/applications/");
        if let Some(user_id) = user_id {
            request = request.with_query("user_id", user_id);
        }
        let envelope: ListEnvelope<Submission> = self.client.send_json(&request).await?;
        Ok(envelope.into_vec())
    }

    async fn get_submission(&self, id: &SubmissionId) -> BackendResult<Submission> {
        Ok(self.client.send_json(&ApiRequest::get(format!("/applications/{id}"))).await?)
    }

    async fn create_submission(&self, submission: &NewSubmission) -> BackendResult<Submission> {
        let request = ApiRequest::post("/applications/").with_json(submission)?;
        Ok(self.client.send_json(&request).await?)
    }

    async fn update_submission(
        &self,
        id: &SubmissionId,
        update: &SubmissionUpdate,
    ) -> BackendResult<Submission> {
        let request = ApiRequest::put(format!("/applications/{id}")).with_json(update)?;
        Ok(self.client.send_json(&request).await?)
    }

    async fn delete_submission(&self, id: &SubmissionId) -> BackendResult<()> {
        Ok(self.client.send_unit(&ApiRequest::delete(format!("/applications/{id}"))).await?)
    }
}

#[async_trait]
impl FormBackend for HttpBackend {
    async fn form_by_name(&self, form_type: &str) -> BackendResult<FormDefinition> {
        Ok(self.client.send_json(&ApiRequest::get(format!("/form/name/{form_type}"))).await?)
    }

    async fn form_questions(&self, form_id: &FormId) -> BackendResult<Vec<FormQuestion>> {
        let request = ApiRequest::get("/form/questions/").with_query("form_id", form_id.0.clone());
        let envelope: ListEnvelope<FormQuestion> = self.client.send_json(&request).await?;
        Ok(envelope.into_vec())
    }

    async fn form_answers(
        &self,
        submission: &SubmissionId,
        question: &QuestionId,
    ) -> BackendResult<FormAnswers> {
        let request = ApiRequest::get(format!("/form/answers/{submission}/{question}"));
        match self.client.send_json::<AnswersEnvelope>(&request).await {
            Ok(AnswersEnvelope::Wrapped { answers }) | Ok(AnswersEnvelope::Bare(answers)) => {
                Ok(answers)
            }
            Err(ClientError::Status { status: 404, .. }) => {
                debug!(
                    event_name = "form.answers.none_saved",
                    submission_id = %submission,
                    question_id = %question,
                    "no saved answers yet"
                );
                Ok(FormAnswers::default())
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn save_form_answers(
        &self,
        submission: &SubmissionId,
        question: &QuestionId,
        answers: &FormAnswers,
    ) -> BackendResult<()> {
        let request = ApiRequest::put(format!("/form/answers/{submission}/{question}"))
            .with_json(&SaveAnswersBody { answers })?;
        Ok(self.client.send_unit(&request).await?)
    }

    async fn fill_pdf(&self, submission: &SubmissionId) -> BackendResult<PdfFillResult> {
        let request = ApiRequest::post(format!("/pdf_fill/application/{submission}"));
        Ok(self.client.send_json(&request).await?)
    }
}

#[async_trait]
impl DocPrepBackend for HttpBackend {
    async fn start_workflow(
        &self,
        request: &StartWorkflowRequest,
    ) -> BackendResult<StartWorkflowResponse> {
        let request =
            ApiRequest::post("/agents/document_prep/start-workflow").with_json(request)?;
        Ok(self.client.send_json(&request).await?)
    }

    async fn workflow_status(&self, session: &WorkflowSessionId) -> BackendResult<WorkflowStatus> {
        let request =
            ApiRequest::get(format!("/agents/document_prep/workflow-status/{session}"));
        Ok(self.client.send_json(&request).await?)
    }

    async fn submit_additional_info(
        &self,
        request: &AdditionalInfoRequest,
    ) -> BackendResult<Acknowledgement> {
        let request =
            ApiRequest::post("/agents/document_prep/submit-additional-info").with_json(request)?;
        Ok(self.client.send_json(&request).await?)
    }

    async fn validate_document(
        &self,
        request: &ValidateDocumentRequest,
    ) -> BackendResult<ValidationReport> {
        let request =
            ApiRequest::post("/agents/document_prep/validate-document").with_json(request)?;
        Ok(self.client.send_json(&request).await?)
    }
}

#[async_trait]
impl AssistantBackend for HttpBackend {
    async fn generate(&self, request: &AssistantRequest) -> BackendResult<AssistantReply> {
        let mut http_request = ApiRequest::post(assistant_path(request.kind));
        if request.kind.requires_report_type() {
            let report_type = request.report_type.as_deref().ok_or_else(|| {
                regpilot_core::DomainError::InvariantViolation(format!(
                    "{:?} requires a report type",
                    request.kind
                ))
            })?;
            http_request = http_request.with_query("type", report_type);
        }
        let http_request = http_request.with_json(&request.payload)?;
        Ok(self.client.send_json(&http_request).await?)
    }
}
