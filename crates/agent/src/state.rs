//! Submission list and active-submission pointer, owned by the application.

use std::sync::Arc;

use regpilot_core::{
    ApplicationError, DomainError, NewSubmission, Submission, SubmissionBackend, SubmissionId,
    SubmissionStatus,
};
use tracing::{info, warn};

pub struct SubmissionStore<B> {
    backend: Arc<B>,
    user_id: Option<String>,
    submissions: Vec<Submission>,
    active: Option<SubmissionId>,
    creating: bool,
}

impl<B> SubmissionStore<B>
where
    B: SubmissionBackend,
{
    pub fn new(backend: Arc<B>, user_id: Option<String>) -> Self {
        Self { backend, user_id, submissions: Vec::new(), active: None, creating: false }
    }

    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    pub fn active_submission(&self) -> Option<&Submission> {
        let active = self.active.as_ref()?;
        self.submissions.iter().find(|submission| &submission.id == active)
    }

    /// True between `create_new_submission` and the next successful create or selection.
    pub fn is_creating(&self) -> bool {
        self.creating
    }

    pub async fn refresh_submissions(&mut self) -> Result<&[Submission], ApplicationError> {
        self.submissions = self.backend.list_submissions(self.user_id.as_deref()).await?;

        let resolves = self
            .active
            .as_ref()
            .is_some_and(|active| self.submissions.iter().any(|s| &s.id == active));
        if !resolves && !self.creating {
            self.active = self.submissions.first().map(|submission| submission.id.clone());
        }

        info!(
            event_name = "submissions.refreshed",
            count = self.submissions.len(),
            active_submission = self.active.as_ref().map(|id| id.0.as_str()).unwrap_or("none"),
            "submission list refreshed"
        );
        Ok(&self.submissions)
    }

    pub fn set_active_submission(&mut self, id: &SubmissionId) -> Result<&Submission, DomainError> {
        let submission = self
            .submissions
            .iter()
            .find(|submission| &submission.id == id)
            .ok_or_else(|| DomainError::InvariantViolation(format!("unknown submission {id}")))?;
        self.active = Some(submission.id.clone());
        self.creating = false;
        Ok(submission)
    }

    /// Clears the active pointer so dependent views switch to the creation wizard.
    pub fn create_new_submission(&mut self) {
        self.active = None;
        self.creating = true;
    }

    pub async fn create_submission(
        &mut self,
        mut submission: NewSubmission,
    ) -> Result<Submission, ApplicationError> {
        if submission.user_id.is_none() {
            submission.user_id = self.user_id.clone();
        }

        let created = self.backend.create_submission(&submission).await?;
        info!(
            event_name = "submissions.created",
            submission_id = %created.id,
            "submission created"
        );

        self.creating = false;
        self.active = Some(created.id.clone());
        self.refresh_submissions().await?;
        if !self.submissions.iter().any(|s| s.id == created.id) {
            self.submissions.push(created.clone());
        }
        Ok(created)
    }

    /// Only drafts may be deleted; anything else is refused before the backend is called.
    pub async fn delete_submission(&mut self, id: &SubmissionId) -> Result<(), ApplicationError> {
        let submission = match self.submissions.iter().find(|submission| &submission.id == id) {
            Some(cached) => cached.clone(),
            None => self.backend.get_submission(id).await?,
        };

        if let Err(error) = submission.ensure_deletable() {
            warn!(
                event_name = "submissions.delete_refused",
                submission_id = %id,
                status = submission.status.as_str(),
                "refusing to delete a submission that is not a draft"
            );
            return Err(error.into());
        }

        self.backend.delete_submission(id).await?;
        self.submissions.retain(|submission| &submission.id != id);
        if self.active.as_ref() == Some(id) {
            self.active = self.submissions.first().map(|submission| submission.id.clone());
        }

        info!(event_name = "submissions.deleted", submission_id = %id, "submission deleted");
        Ok(())
    }

    /// Optimistically overwrites the cached progress after a form step save.
    pub fn record_progress(&mut self, id: &SubmissionId, progress: u8) {
        if let Some(submission) = self.submissions.iter_mut().find(|s| &s.id == id) {
            submission.progress = progress;
            submission.status = SubmissionStatus::for_progress(progress);
        }
    }

    /// Logout: forget everything.
    pub fn reset(&mut self) {
        self.submissions.clear();
        self.active = None;
        self.creating = false;
    }
}
