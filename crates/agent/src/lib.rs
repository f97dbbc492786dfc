//! Controllers for the submission workspace.
//!
//! - [`state::SubmissionStore`] owns the submission list and the active pointer.
//! - [`docprep::DocPrepAgent`] drives a document-preparation run: start, poll,
//!   follow-up questions, completion, export.
//! - [`form_editor::FormEditor`] steps through a form, persisting answers and
//!   pushing progress back to the submission.
//!
//! Controllers depend only on the port traits in `regpilot_core::backend`, so the
//! same code runs against the HTTP backend and the in-memory fakes used in tests.

pub mod docprep;
pub mod form_editor;
pub mod state;

#[cfg(test)]
mod testing;

pub use docprep::{DocPrepAgent, DocPrepSettings, PollHandle, WorkflowSnapshot};
pub use form_editor::{FormEditor, StepOutcome};
pub use state::SubmissionStore;
