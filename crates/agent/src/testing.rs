//! In-memory backend used by the controller tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use regpilot_core::{
    Acknowledgement, AdditionalInfoRequest, ApplicationError, BackendResult, DocPrepBackend,
    FieldType, FormAnswers, FormBackend, FormDefinition, FormField, FormFields, FormId,
    FormQuestion, NewSubmission, PdfFillResult, QuestionId, StartWorkflowRequest,
    StartWorkflowResponse, Submission, SubmissionBackend, SubmissionId, SubmissionStatus,
    SubmissionUpdate, ValidateDocumentRequest, ValidationReport, WorkflowSessionId,
    WorkflowStatus,
};

pub fn submission(id: &str, status: SubmissionStatus) -> Submission {
    let at = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).single().expect("timestamp");
    Submission {
        id: SubmissionId(id.to_string()),
        name: format!("Submission {id}"),
        product_type: "device".to_string(),
        submission_type: "510k".to_string(),
        status,
        progress: 0,
        created_at: at,
        updated_at: at,
        form_id: Some(FormId("form-1".to_string())),
    }
}

pub fn field(field_type: FieldType, required: bool) -> FormField {
    FormField { field_type, required, label: None, placeholder: None, options: Vec::new() }
}

pub fn question(id: &str, fields: Vec<(&str, FormField)>) -> FormQuestion {
    FormQuestion {
        id: QuestionId(id.to_string()),
        name: format!("Question {id}"),
        fields: FormFields::new(
            fields.into_iter().map(|(name, field)| (name.to_string(), field)).collect(),
        ),
    }
}

#[derive(Default)]
struct Inner {
    submissions: Vec<Submission>,
    listed_for: Vec<Option<String>>,
    created_user_ids: Vec<Option<String>>,
    deleted: Vec<SubmissionId>,
    updates: Vec<(SubmissionId, SubmissionUpdate)>,
    form_by_name: Option<FormDefinition>,
    questions: Vec<FormQuestion>,
    answers: HashMap<String, FormAnswers>,
    saved: Vec<(QuestionId, FormAnswers)>,
    pdf_fills: Vec<SubmissionId>,
    fail_saves: bool,
    fail_updates: bool,
    form_calls: usize,
    start_response: Option<BackendResult<StartWorkflowResponse>>,
    started: Vec<StartWorkflowRequest>,
    statuses: VecDeque<BackendResult<WorkflowStatus>>,
    status_delay: Duration,
    status_calls: usize,
    in_flight: usize,
    max_in_flight: usize,
    submitted_info: Vec<AdditionalInfoRequest>,
    validation: Option<BackendResult<ValidationReport>>,
}

#[derive(Default)]
pub struct FakeBackend {
    inner: Mutex<Inner>,
}

impl FakeBackend {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("fake backend lock")
    }

    pub fn add_submission(&self, submission: Submission) {
        self.lock().submissions.push(submission);
    }

    pub fn listed_for(&self) -> Vec<Option<String>> {
        self.lock().listed_for.clone()
    }

    pub fn created_user_ids(&self) -> Vec<Option<String>> {
        self.lock().created_user_ids.clone()
    }

    pub fn deleted(&self) -> Vec<SubmissionId> {
        self.lock().deleted.clone()
    }

    pub fn updates(&self) -> Vec<(SubmissionId, SubmissionUpdate)> {
        self.lock().updates.clone()
    }

    pub fn set_form_by_name(&self, form: FormDefinition) {
        self.lock().form_by_name = Some(form);
    }

    pub fn set_questions(&self, questions: Vec<FormQuestion>) {
        self.lock().questions = questions;
    }

    pub fn questions(&self) -> Vec<FormQuestion> {
        self.lock().questions.clone()
    }

    pub fn set_saved_answers(&self, question: &str, answers: FormAnswers) {
        self.lock().answers.insert(question.to_string(), answers);
    }

    pub fn saved(&self) -> Vec<(QuestionId, FormAnswers)> {
        self.lock().saved.clone()
    }

    pub fn pdf_fills(&self) -> Vec<SubmissionId> {
        self.lock().pdf_fills.clone()
    }

    pub fn fail_saves(&self) {
        self.lock().fail_saves = true;
    }

    pub fn fail_updates(&self) {
        self.lock().fail_updates = true;
    }

    /// Every form-port call, reads included.
    pub fn form_calls(&self) -> usize {
        self.lock().form_calls
    }

    pub fn set_start_response(&self, response: BackendResult<StartWorkflowResponse>) {
        self.lock().start_response = Some(response);
    }

    pub fn started(&self) -> Vec<StartWorkflowRequest> {
        self.lock().started.clone()
    }

    pub fn push_status(&self, status: BackendResult<WorkflowStatus>) {
        self.lock().statuses.push_back(status);
    }

    pub fn set_status_delay(&self, delay: Duration) {
        self.lock().status_delay = delay;
    }

    pub fn status_calls(&self) -> usize {
        self.lock().status_calls
    }

    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    pub fn submitted_info(&self) -> Vec<AdditionalInfoRequest> {
        self.lock().submitted_info.clone()
    }

    pub fn set_validation(&self, report: BackendResult<ValidationReport>) {
        self.lock().validation = Some(report);
    }
}

#[async_trait]
impl SubmissionBackend for FakeBackend {
    async fn list_submissions(&self, user_id: Option<&str>) -> BackendResult<Vec<Submission>> {
        let mut inner = self.lock();
        inner.listed_for.push(user_id.map(str::to_string));
        Ok(inner.submissions.clone())
    }

    async fn get_submission(&self, id: &SubmissionId) -> BackendResult<Submission> {
        self.lock()
            .submissions
            .iter()
            .find(|submission| &submission.id == id)
            .cloned()
            .ok_or(ApplicationError::HttpStatus { status: 404, message: "not found".to_string() })
    }

    async fn create_submission(&self, new: &NewSubmission) -> BackendResult<Submission> {
        let mut inner = self.lock();
        inner.created_user_ids.push(new.user_id.clone());
        let mut created =
            submission(&format!("new-{}", inner.submissions.len() + 1), SubmissionStatus::Draft);
        created.name = new.name.clone();
        created.submission_type = new.submission_type.clone();
        inner.submissions.push(created.clone());
        Ok(created)
    }

    async fn update_submission(
        &self,
        id: &SubmissionId,
        update: &SubmissionUpdate,
    ) -> BackendResult<Submission> {
        let mut inner = self.lock();
        if inner.fail_updates {
            return Err(ApplicationError::HttpStatus { status: 503, message: "busy".to_string() });
        }
        inner.updates.push((id.clone(), update.clone()));
        let stored = inner
            .submissions
            .iter_mut()
            .find(|submission| &submission.id == id)
            .ok_or(ApplicationError::HttpStatus { status: 404, message: "not found".to_string() })?;
        if let Some(progress) = update.progress {
            stored.progress = progress;
        }
        if let Some(status) = update.status {
            stored.status = status;
        }
        Ok(stored.clone())
    }

    async fn delete_submission(&self, id: &SubmissionId) -> BackendResult<()> {
        let mut inner = self.lock();
        inner.deleted.push(id.clone());
        inner.submissions.retain(|submission| &submission.id != id);
        Ok(())
    }
}

#[async_trait]
impl FormBackend for FakeBackend {
    async fn form_by_name(&self, form_type: &str) -> BackendResult<FormDefinition> {
        let mut inner = self.lock();
        inner.form_calls += 1;
        inner.form_by_name.clone().ok_or(ApplicationError::HttpStatus {
            status: 404,
            message: format!("no form named {form_type}"),
        })
    }

    async fn form_questions(&self, _form_id: &FormId) -> BackendResult<Vec<FormQuestion>> {
        let mut inner = self.lock();
        inner.form_calls += 1;
        Ok(inner.questions.clone())
    }

    async fn form_answers(
        &self,
        _submission: &SubmissionId,
        question: &QuestionId,
    ) -> BackendResult<FormAnswers> {
        let mut inner = self.lock();
        inner.form_calls += 1;
        Ok(inner.answers.get(&question.0).cloned().unwrap_or_default())
    }

    async fn save_form_answers(
        &self,
        _submission: &SubmissionId,
        question: &QuestionId,
        answers: &FormAnswers,
    ) -> BackendResult<()> {
        let mut inner = self.lock();
        inner.form_calls += 1;
        if inner.fail_saves {
            return Err(ApplicationError::Transport("connection reset".to_string()));
        }
        inner.saved.push((question.clone(), answers.clone()));
        inner.answers.insert(question.0.clone(), answers.clone());
        Ok(())
    }

    async fn fill_pdf(&self, submission: &SubmissionId) -> BackendResult<PdfFillResult> {
        let mut inner = self.lock();
        inner.form_calls += 1;
        inner.pdf_fills.push(submission.clone());
        Ok(PdfFillResult { pdf_url: format!("https://files.example.com/{submission}.pdf") })
    }
}

#[async_trait]
impl DocPrepBackend for FakeBackend {
    async fn start_workflow(
        &self,
        request: &StartWorkflowRequest,
    ) -> BackendResult<StartWorkflowResponse> {
        let mut inner = self.lock();
        inner.started.push(request.clone());
        inner.start_response.clone().unwrap_or(Ok(StartWorkflowResponse {
            success: true,
            message: None,
            session_id: Some(request.session_id.clone()),
        }))
    }

    async fn workflow_status(&self, _session: &WorkflowSessionId) -> BackendResult<WorkflowStatus> {
        let delay = {
            let mut inner = self.lock();
            inner.status_calls += 1;
            inner.in_flight += 1;
            inner.max_in_flight = inner.max_in_flight.max(inner.in_flight);
            inner.status_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.lock();
        inner.in_flight -= 1;
        inner.statuses.pop_front().unwrap_or(Ok(WorkflowStatus::Processing { message: None }))
    }

    async fn submit_additional_info(
        &self,
        request: &AdditionalInfoRequest,
    ) -> BackendResult<Acknowledgement> {
        self.lock().submitted_info.push(request.clone());
        Ok(Acknowledgement { success: true, message: None })
    }

    async fn validate_document(
        &self,
        _request: &ValidateDocumentRequest,
    ) -> BackendResult<ValidationReport> {
        self.lock()
            .validation
            .clone()
            .unwrap_or(Err(ApplicationError::Transport("validator offline".to_string())))
    }
}
