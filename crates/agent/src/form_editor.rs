//! Step-by-step editing of one submission's form.
//!
//! The editor holds a cursor into the ordered questions of the submission's form.
//! Answers belong to exactly one (submission, question) pair: leaving a question
//! persists its answers, entering one replaces the in-memory answers with whatever
//! the backend has saved for it.

use std::sync::Arc;

use regpilot_core::progress::submission_progress;
use regpilot_core::{
    AnswerValue, ApplicationError, DomainError, FormAnswers, FormBackend, FormQuestion,
    Submission, SubmissionBackend, SubmissionUpdate,
};
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Required fields are empty; nothing was sent.
    Blocked { missing: Vec<String> },
    Advanced { index: usize, progress: u8 },
    Finished { pdf_url: String, progress: u8 },
}

pub struct FormEditor<B> {
    backend: Arc<B>,
    submission: Submission,
    questions: Vec<FormQuestion>,
    current: usize,
    answers: FormAnswers,
    completion: Vec<f64>,
    invalid_fields: Vec<String>,
}

impl<B> FormEditor<B>
where
    B: FormBackend + SubmissionBackend,
{
    /// Resolves the submission's form, loads its questions and enters the first one.
    pub async fn open(backend: Arc<B>, submission: Submission) -> Result<Self, ApplicationError> {
        let form_id = match submission.form_id.clone() {
            Some(form_id) => form_id,
            None => backend.form_by_name(&submission.submission_type).await?.id,
        };

        let questions = backend.form_questions(&form_id).await?;
        if questions.is_empty() {
            return Err(DomainError::InvariantViolation(format!(
                "form {form_id} has no questions"
            ))
            .into());
        }

        info!(
            event_name = "form.editor.opened",
            submission_id = %submission.id,
            form_id = %form_id,
            question_count = questions.len(),
            "form editor opened"
        );

        // Every step's saved answers count toward progress, not only the visited ones.
        let mut completion = Vec::with_capacity(questions.len());
        let mut first_answers = FormAnswers::default();
        for (index, question) in questions.iter().enumerate() {
            let saved = backend.form_answers(&submission.id, &question.id).await?;
            completion.push(question.fraction_complete(&saved));
            if index == 0 {
                first_answers = saved;
            }
        }

        Ok(Self {
            backend,
            submission,
            questions,
            current: 0,
            answers: first_answers,
            completion,
            invalid_fields: Vec::new(),
        })
    }

    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    pub fn questions(&self) -> &[FormQuestion] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &FormQuestion {
        &self.questions[self.current]
    }

    pub fn is_last_question(&self) -> bool {
        self.current + 1 == self.questions.len()
    }

    pub fn answers(&self) -> &FormAnswers {
        &self.answers
    }

    /// Fields flagged by the last blocked `next`.
    pub fn invalid_fields(&self) -> &[String] {
        &self.invalid_fields
    }

    pub fn progress(&self) -> u8 {
        submission_progress(&self.completion, self.current)
    }

    pub fn set_answer(&mut self, field_id: &str, value: AnswerValue) {
        self.answers.set(field_id, value);
        self.refresh_completion();

        let missing = self.questions[self.current].missing_required(&self.answers);
        self.invalid_fields.retain(|field| missing.contains(field));
    }

    pub fn is_current_question_valid(&self) -> bool {
        self.current_question().is_complete(&self.answers)
    }

    /// Persists the current answers and pushes the recomputed progress.
    pub async fn save(&mut self) -> Result<u8, ApplicationError> {
        let question_id = self.questions[self.current].id.clone();
        self.backend.save_form_answers(&self.submission.id, &question_id, &self.answers).await?;

        self.refresh_completion();
        let progress = self.progress();
        let update = SubmissionUpdate::progress(progress);
        self.backend.update_submission(&self.submission.id, &update).await?;
        self.submission.progress = progress;
        if let Some(status) = update.status {
            self.submission.status = status;
        }

        debug!(
            event_name = "form.step.saved",
            submission_id = %self.submission.id,
            question_id = %question_id,
            progress,
            "form step saved"
        );
        Ok(progress)
    }

    /// Validates, saves, then moves forward. On the last question the filled PDF is requested.
    pub async fn next(&mut self) -> Result<StepOutcome, ApplicationError> {
        let missing = self.current_question().missing_required(&self.answers);
        if !missing.is_empty() {
            debug!(
                event_name = "form.step.blocked",
                submission_id = %self.submission.id,
                question_id = %self.current_question().id,
                missing = ?missing,
                "required fields missing"
            );
            self.invalid_fields = missing.clone();
            return Ok(StepOutcome::Blocked { missing });
        }

        let progress = self.save().await?;
        if self.is_last_question() {
            let filled = self.backend.fill_pdf(&self.submission.id).await?;
            info!(
                event_name = "form.pdf.filled",
                submission_id = %self.submission.id,
                pdf_url = %filled.pdf_url,
                "form completed and pdf generated"
            );
            return Ok(StepOutcome::Finished { pdf_url: filled.pdf_url, progress });
        }

        let index = self.current + 1;
        self.enter(index).await?;
        Ok(StepOutcome::Advanced { index, progress })
    }

    /// Saves without validation and steps back. A no-op on the first question.
    pub async fn previous(&mut self) -> Result<usize, ApplicationError> {
        if self.current == 0 {
            return Ok(0);
        }
        self.save().await?;
        let index = self.current - 1;
        self.enter(index).await?;
        Ok(index)
    }

    /// Saves without validation and jumps to `index`.
    pub async fn go_to(&mut self, index: usize) -> Result<(), ApplicationError> {
        if index >= self.questions.len() {
            return Err(DomainError::InvariantViolation(format!(
                "question index {index} out of range (0..{})",
                self.questions.len()
            ))
            .into());
        }
        if index == self.current {
            return Ok(());
        }
        self.save().await?;
        self.enter(index).await
    }

    async fn enter(&mut self, index: usize) -> Result<(), ApplicationError> {
        let question = &self.questions[index];
        let answers = self.backend.form_answers(&self.submission.id, &question.id).await?;

        self.current = index;
        self.answers = answers;
        self.invalid_fields.clear();
        self.refresh_completion();
        Ok(())
    }

    fn refresh_completion(&mut self) {
        self.completion[self.current] =
            self.questions[self.current].fraction_complete(&self.answers);
    }
}
