//! Document-preparation workflow controller.
//!
//! A workflow run is identified by a client-generated session id. Starting a run
//! posts the request and spawns one poll task for that session; the task issues a
//! status request, waits for it to resolve, sleeps for the poll interval and repeats
//! until the backend asks for input, completes or fails. Every state change goes
//! through the [`FlowEngine`] and is published on a `watch` channel.
//!
//! A poll task is owned by a [`PollHandle`]. Starting another run, submitting
//! answers, cancelling or dropping the agent aborts it, and every update it makes is
//! checked against the current session id so a late response cannot touch a newer run.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use regpilot_core::config::{AppConfig, FallbackMode, WorkflowConfig};
use regpilot_core::flows::{
    DocPrepFlow, FlowContext, FlowEvent, FlowTransitionError, TransitionOutcome,
};
use regpilot_core::{
    Acknowledgement, AdditionalInfoRequest, ApplicationError, DocPrepBackend, DomainError,
    ExportFormat, FlowEngine, ResultOrigin, StartWorkflowRequest, ValidateDocumentRequest,
    ValidationOutcome, ValidationReport, WorkflowPhase, WorkflowSessionId, WorkflowStatus,
};
use regpilot_export::{
    layout_document, DocumentLayout, ExportArtifact, ExportRequest, ExportService, PageSetup,
};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocPrepSettings {
    pub poll_interval: Duration,
    pub max_poll_attempts: Option<u32>,
    pub fallback: FallbackMode,
}

impl Default for DocPrepSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default().workflow)
    }
}

impl From<&WorkflowConfig> for DocPrepSettings {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_poll_attempts: config.max_poll_attempts,
            fallback: config.fallback,
        }
    }
}

/// What observers see of the current run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WorkflowSnapshot {
    pub session_id: Option<WorkflowSessionId>,
    pub document_type: Option<String>,
    pub attachment_type: Option<String>,
    pub phase: WorkflowPhase,
    pub status_message: Option<String>,
    pub questions: Vec<String>,
    pub document: Option<String>,
    pub error: Option<String>,
    pub origin: ResultOrigin,
    pub poll_count: u32,
}

impl WorkflowSnapshot {
    pub fn is_download_ready(&self) -> bool {
        self.phase == WorkflowPhase::Completed && self.document.is_some()
    }
}

/// Owns a spawned poll task; dropping the handle aborts the task.
#[derive(Debug)]
pub struct PollHandle {
    session_id: WorkflowSessionId,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn session_id(&self) -> &WorkflowSessionId {
        &self.session_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Shared<B> {
    backend: Arc<B>,
    engine: FlowEngine<DocPrepFlow>,
    settings: DocPrepSettings,
    state: watch::Sender<WorkflowSnapshot>,
}

impl<B> Shared<B> {
    fn current_session(&self) -> Option<WorkflowSessionId> {
        self.state.borrow().session_id.clone()
    }

    /// Applies `event` to the run identified by `session`.
    ///
    /// Returns `Ok(None)` when `session` is no longer the current run; nothing is changed.
    fn transition<F>(
        &self,
        session: &WorkflowSessionId,
        event: FlowEvent,
        context: FlowContext,
        update: F,
    ) -> Result<Option<TransitionOutcome>, ApplicationError>
    where
        F: FnOnce(&mut WorkflowSnapshot),
    {
        let mut result = Ok(None);
        self.state.send_if_modified(|snapshot| {
            if snapshot.session_id.as_ref() != Some(session) {
                return false;
            }
            match self.engine.apply(&snapshot.phase, &event, &context) {
                Ok(outcome) => {
                    snapshot.phase = outcome.to;
                    update(snapshot);
                    result = Ok(Some(outcome));
                    true
                }
                Err(error) => {
                    result = Err(ApplicationError::from(DomainError::from(error)));
                    false
                }
            }
        });

        match &result {
            Ok(Some(outcome)) => debug!(
                event_name = "docprep.phase.changed",
                session_id = %session,
                from = outcome.from.as_str(),
                to = outcome.to.as_str(),
                "workflow phase changed"
            ),
            Ok(None) => debug!(
                event_name = "docprep.update.stale",
                session_id = %session,
                "ignoring update for a superseded session"
            ),
            Err(_) => {}
        }
        result
    }

    /// Keeps the phase but makes a refused transition visible on the snapshot.
    fn record_rejection(
        &self,
        session: &WorkflowSessionId,
        event: &FlowEvent,
        error: &ApplicationError,
    ) {
        warn!(
            event_name = "docprep.transition.rejected",
            session_id = %session,
            event = ?event,
            error = %error,
            "workflow state machine refused the transition"
        );
        let message = error.to_string();
        self.state.send_if_modified(|snapshot| {
            if snapshot.session_id.as_ref() != Some(session) {
                return false;
            }
            snapshot.error = Some(message);
            true
        });
    }
}

pub struct DocPrepAgent<B> {
    shared: Arc<Shared<B>>,
    exporter: ExportService,
    poll: Option<PollHandle>,
}

impl<B> DocPrepAgent<B>
where
    B: DocPrepBackend + 'static,
{
    pub fn new(backend: Arc<B>, settings: DocPrepSettings, exporter: ExportService) -> Self {
        let (state, _) = watch::channel(WorkflowSnapshot::default());
        let shared = Arc::new(Shared { backend, engine: FlowEngine::default(), settings, state });
        Self { shared, exporter, poll: None }
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowSnapshot> {
        self.shared.state.subscribe()
    }

    pub fn poll_handle(&self) -> Option<&PollHandle> {
        self.poll.as_ref()
    }

    /// Resolves once the run is idle, waiting for input, completed or failed.
    pub async fn wait_until_settled(&self) -> WorkflowSnapshot {
        let mut receiver = self.shared.state.subscribe();
        let settled = match receiver.wait_for(|snapshot| snapshot.phase.is_settled()).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        };
        settled
    }

    /// Starts a new run, abandoning any previous one.
    pub async fn start_workflow(
        &mut self,
        document_type: &str,
        attachment_type: &str,
    ) -> Result<WorkflowSessionId, ApplicationError> {
        self.stop_polling();

        let session = WorkflowSessionId::generate();
        self.shared.state.send_replace(WorkflowSnapshot {
            session_id: Some(session.clone()),
            document_type: Some(document_type.to_string()),
            attachment_type: Some(attachment_type.to_string()),
            ..WorkflowSnapshot::default()
        });
        self.shared.transition(&session, FlowEvent::StartRequested, FlowContext::default(), |_| {})?;

        info!(
            event_name = "docprep.workflow.starting",
            session_id = %session,
            document_type,
            attachment_type,
            "starting document workflow"
        );

        let request = StartWorkflowRequest {
            session_id: session.clone(),
            document_type: document_type.to_string(),
            attachment_type: attachment_type.to_string(),
        };
        let failure = match self.shared.backend.start_workflow(&request).await {
            Ok(response) if response.success => {
                self.shared.transition(
                    &session,
                    FlowEvent::StartAccepted,
                    FlowContext::default(),
                    |snapshot| snapshot.status_message = response.message.clone(),
                )?;
                self.spawn_poller(session.clone());
                return Ok(session);
            }
            Ok(response) => ApplicationError::Backend(
                response.message.unwrap_or_else(|| "workflow start was rejected".to_string()),
            ),
            Err(error) => error,
        };

        if self.shared.settings.fallback == FallbackMode::Mock {
            warn!(
                event_name = "docprep.workflow.fallback",
                session_id = %session,
                error = %failure,
                "workflow start failed; substituting a locally generated placeholder document"
            );
            let document = placeholder_document(document_type, attachment_type);
            self.shared.transition(
                &session,
                FlowEvent::FallbackSubstituted,
                FlowContext::default(),
                |snapshot| {
                    snapshot.document = Some(document);
                    snapshot.origin = ResultOrigin::Fallback;
                },
            )?;
            return Ok(session);
        }

        let event = match failure {
            ApplicationError::Backend(_) => FlowEvent::StartRejected,
            _ => FlowEvent::TransportFailed,
        };
        let message = failure.to_string();
        warn!(
            event_name = "docprep.workflow.start_failed",
            session_id = %session,
            error = %message,
            "workflow start failed"
        );
        self.shared.transition(&session, event, FlowContext::default(), |snapshot| {
            snapshot.error = Some(message);
        })?;
        Err(failure)
    }

    /// Posts answers for every outstanding question and resumes polling.
    ///
    /// Blank or missing answers are refused locally with `MissingRequiredFields`.
    pub async fn submit_additional_answers(
        &mut self,
        answers: BTreeMap<String, String>,
    ) -> Result<Acknowledgement, ApplicationError> {
        let snapshot = self.snapshot();
        let session = snapshot.session_id.clone().ok_or_else(|| {
            DomainError::InvariantViolation("no workflow session is active".to_string())
        })?;

        let unanswered: Vec<String> = snapshot
            .questions
            .iter()
            .filter(|question| answers.get(*question).map_or(true, |a| a.trim().is_empty()))
            .cloned()
            .collect();
        let context = FlowContext { unanswered_questions: unanswered };
        if let Err(error) =
            self.shared.engine.apply(&snapshot.phase, &FlowEvent::AnswersSubmitted, &context)
        {
            return Err(match error {
                FlowTransitionError::UnansweredQuestions { questions, .. } => {
                    DomainError::MissingRequiredFields { fields: questions }
                }
                other => DomainError::from(other),
            }
            .into());
        }

        self.stop_polling();
        let request = AdditionalInfoRequest { session_id: session.clone(), answers };
        let acknowledgement = match self.shared.backend.submit_additional_info(&request).await {
            Ok(ack) => ack,
            Err(error) => {
                let message = error.to_string();
                self.shared.transition(
                    &session,
                    FlowEvent::TransportFailed,
                    FlowContext::default(),
                    |snapshot| snapshot.error = Some(message),
                )?;
                return Err(error);
            }
        };
        if !acknowledgement.success {
            return Err(ApplicationError::Backend(
                acknowledgement
                    .message
                    .unwrap_or_else(|| "answers were not accepted".to_string()),
            ));
        }

        self.shared.transition(
            &session,
            FlowEvent::AnswersSubmitted,
            FlowContext::default(),
            |snapshot| snapshot.questions.clear(),
        )?;
        info!(
            event_name = "docprep.answers.submitted",
            session_id = %session,
            "follow-up answers submitted; polling resumed"
        );
        self.spawn_poller(session);
        Ok(acknowledgement)
    }

    /// One-shot validation; does not touch the workflow state.
    pub async fn validate_document(
        &self,
        content: &str,
        document_type: &str,
    ) -> Result<ValidationOutcome, ApplicationError> {
        let request = ValidateDocumentRequest {
            content: content.to_string(),
            document_type: document_type.to_string(),
        };
        match self.shared.backend.validate_document(&request).await {
            Ok(report) => Ok(ValidationOutcome { report, origin: ResultOrigin::Backend }),
            Err(error) if self.shared.settings.fallback == FallbackMode::Mock => {
                warn!(
                    event_name = "docprep.validation.fallback",
                    document_type,
                    error = %error,
                    "validation failed; substituting a placeholder report"
                );
                Ok(ValidationOutcome {
                    report: ValidationReport::placeholder(document_type),
                    origin: ResultOrigin::Fallback,
                })
            }
            Err(error) => Err(error),
        }
    }

    /// Stops polling and returns the run to `idle`, keeping anything already received.
    pub fn cancel(&mut self) -> Result<(), ApplicationError> {
        self.stop_polling();
        if let Some(session) = self.shared.current_session() {
            self.shared.transition(&session, FlowEvent::Reset, FlowContext::default(), |_| {})?;
        }
        Ok(())
    }

    /// Forgets the current run entirely.
    pub fn reset(&mut self) {
        self.stop_polling();
        self.shared.state.send_replace(WorkflowSnapshot::default());
    }

    /// Page layout of the completed document, as the PDF export would draw it.
    pub fn document_layout(&self) -> Result<DocumentLayout, ApplicationError> {
        let document = self.completed_document()?;
        layout_document(&document, PageSetup::default(), Utc::now())
            .map_err(|error| ApplicationError::Export(error.to_string()))
    }

    /// Exports the completed document. PDF failures fall back to plain text.
    pub fn export(
        &self,
        format: ExportFormat,
        filename: Option<String>,
    ) -> Result<ExportArtifact, ApplicationError> {
        let document = self.completed_document()?;
        let snapshot = self.snapshot();

        let mut request = ExportRequest::new(format, document);
        request.filename = filename;
        request.report_type = snapshot.attachment_type;
        self.exporter
            .export_with_fallback(&request)
            .map_err(|error| ApplicationError::Export(error.to_string()))
    }

    fn completed_document(&self) -> Result<String, ApplicationError> {
        let snapshot = self.snapshot();
        match snapshot.document {
            Some(document) if snapshot.phase == WorkflowPhase::Completed => Ok(document),
            _ => Err(DomainError::InvariantViolation(format!(
                "no completed document to export (phase {})",
                snapshot.phase.as_str()
            ))
            .into()),
        }
    }

    fn stop_polling(&mut self) {
        if let Some(handle) = self.poll.take() {
            debug!(
                event_name = "docprep.poll.cancelled",
                session_id = %handle.session_id,
                "poll task aborted"
            );
        }
    }

    fn spawn_poller(&mut self, session: WorkflowSessionId) {
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(poll_until_settled(shared, session.clone()));
        self.poll = Some(PollHandle { session_id: session, task });
    }
}

async fn poll_until_settled<B>(shared: Arc<Shared<B>>, session: WorkflowSessionId)
where
    B: DocPrepBackend,
{
    let mut attempts: u32 = 0;
    loop {
        if let Some(max) = shared.settings.max_poll_attempts {
            if attempts >= max {
                warn!(
                    event_name = "docprep.poll.exhausted",
                    session_id = %session,
                    attempts,
                    "workflow still processing after the maximum number of polls"
                );
                let message = format!("workflow did not finish after {attempts} status checks");
                let event = FlowEvent::PollingExhausted;
                if let Err(error) = shared.transition(
                    &session,
                    event.clone(),
                    FlowContext::default(),
                    |snapshot| snapshot.error = Some(message),
                ) {
                    shared.record_rejection(&session, &event, &error);
                }
                return;
            }
        }

        attempts += 1;
        let status = shared.backend.workflow_status(&session).await;
        if shared.current_session().as_ref() != Some(&session) {
            return;
        }

        let (event, update): (FlowEvent, Box<dyn FnOnce(&mut WorkflowSnapshot) + Send>) =
            match status {
                Ok(WorkflowStatus::Processing { message }) => (
                    FlowEvent::StatusProcessing,
                    Box::new(move |snapshot| {
                        snapshot.status_message = message;
                        snapshot.poll_count = attempts;
                    }),
                ),
                Ok(WorkflowStatus::AwaitingUserInput { additional_questions }) => (
                    FlowEvent::InputRequested,
                    Box::new(move |snapshot| {
                        snapshot.questions = additional_questions;
                        snapshot.poll_count = attempts;
                    }),
                ),
                Ok(WorkflowStatus::Completed { final_document }) => (
                    FlowEvent::DocumentReady,
                    Box::new(move |snapshot| {
                        snapshot.document = Some(final_document);
                        snapshot.origin = ResultOrigin::Backend;
                        snapshot.poll_count = attempts;
                    }),
                ),
                Ok(failed @ WorkflowStatus::Error { .. }) => {
                    let message = failed
                        .error_message()
                        .unwrap_or_else(|| "document workflow failed".to_string());
                    (
                        FlowEvent::WorkflowFailed,
                        Box::new(move |snapshot| {
                            snapshot.error = Some(message);
                            snapshot.poll_count = attempts;
                        }),
                    )
                }
                Err(error) => {
                    let message = error.to_string();
                    (
                        FlowEvent::TransportFailed,
                        Box::new(move |snapshot| {
                            snapshot.error = Some(message);
                            snapshot.poll_count = attempts;
                        }),
                    )
                }
            };

        debug!(
            event_name = "docprep.poll.status_received",
            session_id = %session,
            attempt = attempts,
            event = ?event,
            "workflow status received"
        );
        let keep_polling = event == FlowEvent::StatusProcessing;
        match shared.transition(&session, event.clone(), FlowContext::default(), update) {
            Ok(Some(_)) if keep_polling => tokio::time::sleep(shared.settings.poll_interval).await,
            Ok(Some(_)) | Ok(None) => return,
            Err(error) => {
                shared.record_rejection(&session, &event, &error);
                return;
            }
        }
    }
}

fn placeholder_document(document_type: &str, attachment_type: &str) -> String {
    let heading = attachment_type
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars
                .next()
                .map(|first| first.to_uppercase().chain(chars).collect::<String>())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "# {heading}\n\n\
         > Placeholder generated locally; the document service did not respond.\n\n\
         ## Summary\n\n\
         Replace this section with the {attachment_type} content for the \
         {document_type} submission.\n\n\
         ## Next steps\n\n\
         - Re-run document preparation once the service is reachable\n\
         - Review every section before filing\n"
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    use regpilot_core::config::FallbackMode;
    use regpilot_core::{
        ApplicationError, DomainError, ExportFormat, ResultOrigin, StartWorkflowResponse,
        ValidationReport, WorkflowPhase, WorkflowSessionId, WorkflowStatus,
    };
    use regpilot_export::ExportService;

    use super::{poll_until_settled, DocPrepAgent, DocPrepSettings, WorkflowSnapshot};
    use crate::testing::FakeBackend;

    fn agent(backend: &Arc<FakeBackend>, settings: DocPrepSettings) -> DocPrepAgent<FakeBackend> {
        DocPrepAgent::new(Arc::clone(backend), settings, ExportService::new().expect("exporter"))
    }

    fn answers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn device_description_run_ends_with_a_title_heading() {
        let backend = Arc::new(FakeBackend::default());
        backend.push_status(Ok(WorkflowStatus::AwaitingUserInput {
            additional_questions: vec!["Q1".to_string()],
        }));
        let mut agent = agent(&backend, DocPrepSettings::default());

        agent.start_workflow("510k", "device-description").await.expect("start");
        let waiting = agent.wait_until_settled().await;
        assert_eq!(waiting.phase, WorkflowPhase::AwaitingUserInput);
        assert_eq!(waiting.questions, vec!["Q1".to_string()]);

        backend.push_status(Ok(WorkflowStatus::Completed {
            final_document: "# Title\nBody".to_string(),
        }));
        agent.submit_additional_answers(answers(&[("Q1", "Class II")])).await.expect("submit");
        let done = agent.wait_until_settled().await;

        assert!(done.is_download_ready());
        assert_eq!(done.origin, ResultOrigin::Backend);
        let layout = agent.document_layout().expect("layout");
        assert_eq!(layout.headings().first(), Some(&(1, "Title".to_string())));

        let started = backend.started();
        assert_eq!(started[0].attachment_type, "device-description");
        assert_eq!(backend.submitted_info()[0].answers, answers(&[("Q1", "Class II")]));
    }

    #[tokio::test(start_paused = true)]
    async fn polls_never_overlap() {
        let backend = Arc::new(FakeBackend::default());
        backend.set_status_delay(Duration::from_secs(5));
        for _ in 0..4 {
            backend.push_status(Ok(WorkflowStatus::Processing { message: None }));
        }
        backend.push_status(Ok(WorkflowStatus::Completed { final_document: "# Done".to_string() }));
        let mut agent = agent(&backend, DocPrepSettings::default());

        agent.start_workflow("510k", "labeling").await.expect("start");
        let done = agent.wait_until_settled().await;

        assert_eq!(done.phase, WorkflowPhase::Completed);
        assert_eq!(done.poll_count, 5);
        assert_eq!(backend.status_calls(), 5);
        assert_eq!(backend.max_in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_abandons_the_previous_session() {
        let backend = Arc::new(FakeBackend::default());
        backend.set_status_delay(Duration::from_secs(1));
        let mut agent = agent(&backend, DocPrepSettings::default());

        let first = agent.start_workflow("510k", "labeling").await.expect("first start");
        tokio::time::sleep(Duration::from_secs(10)).await;
        let second = agent.start_workflow("510k", "labeling").await.expect("second start");

        assert_ne!(first, second);
        assert_eq!(agent.poll_handle().map(|handle| handle.session_id()), Some(&second));
        assert_eq!(agent.snapshot().session_id, Some(second));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_polling_ends_in_error() {
        let backend = Arc::new(FakeBackend::default());
        let settings = DocPrepSettings { max_poll_attempts: Some(3), ..DocPrepSettings::default() };
        let mut agent = agent(&backend, settings);

        agent.start_workflow("510k", "labeling").await.expect("start");
        let settled = agent.wait_until_settled().await;

        assert_eq!(settled.phase, WorkflowPhase::Error);
        assert_eq!(backend.status_calls(), 3);
        assert!(settled.error.unwrap_or_default().contains("3 status checks"));
    }

    #[tokio::test]
    async fn rejected_start_surfaces_the_server_message() {
        let backend = Arc::new(FakeBackend::default());
        backend.set_start_response(Ok(StartWorkflowResponse {
            success: false,
            message: Some("unsupported attachment".to_string()),
            session_id: None,
        }));
        let mut agent = agent(&backend, DocPrepSettings::default());

        let error = agent.start_workflow("510k", "unknown").await.expect_err("rejected");

        assert_eq!(error, ApplicationError::Backend("unsupported attachment".to_string()));
        let snapshot = agent.snapshot();
        assert_eq!(snapshot.phase, WorkflowPhase::Error);
        assert!(agent.poll_handle().is_none());
    }

    #[tokio::test]
    async fn failed_start_uses_placeholder_only_when_fallback_is_enabled() {
        let backend = Arc::new(FakeBackend::default());
        backend.set_start_response(Err(ApplicationError::Transport("refused".to_string())));

        let mut strict = agent(&backend, DocPrepSettings::default());
        let error = strict.start_workflow("510k", "device-description").await.expect_err("fails");
        assert!(matches!(error, ApplicationError::Transport(_)));
        assert_eq!(strict.snapshot().phase, WorkflowPhase::Error);

        let settings = DocPrepSettings { fallback: FallbackMode::Mock, ..DocPrepSettings::default() };
        let mut lenient = agent(&backend, settings);
        lenient.start_workflow("510k", "device-description").await.expect("fallback");
        let snapshot = lenient.snapshot();

        assert_eq!(snapshot.phase, WorkflowPhase::Completed);
        assert_eq!(snapshot.origin, ResultOrigin::Fallback);
        assert!(snapshot.document.unwrap_or_default().starts_with("# Device Description"));
    }

    #[tokio::test(start_paused = true)]
    async fn blank_answers_are_refused_before_any_request() {
        let backend = Arc::new(FakeBackend::default());
        backend.push_status(Ok(WorkflowStatus::AwaitingUserInput {
            additional_questions: vec!["Q1".to_string(), "Q2".to_string()],
        }));
        let mut agent = agent(&backend, DocPrepSettings::default());
        agent.start_workflow("510k", "device-description").await.expect("start");
        agent.wait_until_settled().await;

        let error = agent
            .submit_additional_answers(answers(&[("Q1", "yes"), ("Q2", "  ")]))
            .await
            .expect_err("Q2 is blank");

        assert_eq!(
            error,
            ApplicationError::Domain(DomainError::MissingRequiredFields {
                fields: vec!["Q2".to_string()],
            })
        );
        assert!(backend.submitted_info().is_empty());
        assert_eq!(agent.snapshot().phase, WorkflowPhase::AwaitingUserInput);
    }

    #[tokio::test]
    async fn validation_falls_back_only_when_configured() {
        let backend = Arc::new(FakeBackend::default());
        let strict = agent(&backend, DocPrepSettings::default());
        assert!(strict.validate_document("content", "510k").await.is_err());

        let settings = DocPrepSettings { fallback: FallbackMode::Mock, ..DocPrepSettings::default() };
        let lenient = agent(&backend, settings);
        let outcome = lenient.validate_document("content", "510k").await.expect("fallback");
        assert_eq!(outcome.origin, ResultOrigin::Fallback);

        backend.set_validation(Ok(ValidationReport {
            compliance_score: 87.5,
            issues: Vec::new(),
            recommendations: vec!["Add shelf-life data".to_string()],
        }));
        let outcome = strict.validate_document("content", "510k").await.expect("report");
        assert_eq!(outcome.origin, ResultOrigin::Backend);
        assert_eq!(outcome.report.compliance_score, 87.5);
    }

    #[tokio::test(start_paused = true)]
    async fn export_requires_a_completed_document() {
        let backend = Arc::new(FakeBackend::default());
        backend.push_status(Ok(WorkflowStatus::Completed {
            final_document: "# Labeling\n\nIndications for use".to_string(),
        }));
        let mut agent = agent(&backend, DocPrepSettings::default());

        assert!(matches!(
            agent.export(ExportFormat::Txt, None),
            Err(ApplicationError::Domain(DomainError::InvariantViolation(_)))
        ));

        agent.start_workflow("510k", "labeling").await.expect("start");
        agent.wait_until_settled().await;
        let artifact = agent.export(ExportFormat::Txt, None).expect("export");

        assert!(artifact.filename.starts_with("Labeling_"));
        assert_eq!(artifact.bytes, b"Labeling\n\nIndications for use".to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_polling_and_goes_idle() {
        let backend = Arc::new(FakeBackend::default());
        let mut agent = agent(&backend, DocPrepSettings::default());
        agent.start_workflow("510k", "labeling").await.expect("start");
        tokio::time::sleep(Duration::from_secs(7)).await;

        agent.cancel().expect("cancel");
        let calls = backend.status_calls();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(agent.snapshot().phase, WorkflowPhase::Idle);
        assert_eq!(backend.status_calls(), calls);
        assert!(agent.poll_handle().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn refused_exhaustion_is_surfaced_on_the_snapshot() {
        let backend = Arc::new(FakeBackend::default());
        let settings = DocPrepSettings { max_poll_attempts: Some(0), ..DocPrepSettings::default() };
        let agent = agent(&backend, settings);
        let session = WorkflowSessionId::generate();
        agent.shared.state.send_replace(WorkflowSnapshot {
            session_id: Some(session.clone()),
            phase: WorkflowPhase::AwaitingUserInput,
            questions: vec!["Q1".to_string()],
            ..WorkflowSnapshot::default()
        });

        poll_until_settled(Arc::clone(&agent.shared), session).await;

        let snapshot = agent.snapshot();
        assert_eq!(snapshot.phase, WorkflowPhase::AwaitingUserInput);
        assert!(snapshot.error.is_some(), "refused transition must leave a trace");
        assert_eq!(backend.status_calls(), 0);
    }
}
