use std::sync::Arc;

use regpilot_agent::{FormEditor, StepOutcome};
use regpilot_client::HttpBackend;
use regpilot_core::config::AppConfig;
use regpilot_core::{
    AnswerValue, ApplicationError, ExportFormat, FieldType, FormBackend, FormField,
    SubmissionBackend, SubmissionId,
};
use regpilot_export::{write_artifact, ExportArtifact};
use tracing::{info, warn};

use crate::commands::{connect, export_error, CommandResult, Prompt};

const BACK: &str = ":back";
const QUIT: &str = ":quit";

/// What the user typed for one field.
#[derive(Clone, Debug, PartialEq)]
enum FieldInput {
    Keep,
    Value(AnswerValue),
    Back,
    Quit,
}

/// How a walk through the form ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormWalk {
    Finished { pdf_url: String, progress: u8 },
    Paused { progress: u8 },
}

pub async fn execute(
    config: &AppConfig,
    id: SubmissionId,
    prompt: &mut dyn Prompt,
) -> CommandResult {
    let backend = match connect(config) {
        Ok(backend) => backend,
        Err(error) => return CommandResult::from_error("form", error),
    };

    let walk = match walk_form(Arc::clone(&backend), &id, prompt).await {
        Ok(walk) => walk,
        Err(error) => return CommandResult::from_error("form", error),
    };
    match walk {
        FormWalk::Paused { progress } => CommandResult::success(
            "form",
            format!("saved; submission {id} is {progress}% complete"),
        ),
        FormWalk::Finished { pdf_url, .. } => {
            match download_pdf(&backend, config, &id, &pdf_url).await {
                Ok(path) => CommandResult::success("form", format!("form complete; wrote {path}")),
                Err(error) => CommandResult::from_error("form", error),
            }
        }
    }
}

/// Steps through every question of the submission's form.
///
/// Empty input keeps the saved answer, `:back` returns to the previous question and
/// `:quit` saves the current one and stops.
pub async fn walk_form<B>(
    backend: Arc<B>,
    id: &SubmissionId,
    prompt: &mut dyn Prompt,
) -> Result<FormWalk, ApplicationError>
where
    B: FormBackend + SubmissionBackend,
{
    let submission = backend.get_submission(id).await?;
    let mut editor = FormEditor::open(backend, submission).await?;
    let total = editor.questions().len();

    'questions: loop {
        let question = editor.current_question().clone();
        prompt.say(&format!(
            "[{}/{}] {} ({}% complete)",
            editor.current_index() + 1,
            total,
            question.name,
            editor.progress()
        ));

        for (field_id, field) in question.fields.iter() {
            let current = editor.answers().get(field_id).cloned();
            let label = describe_field(field_id, field, current.as_ref());
            let raw = match prompt.ask(&label) {
                Ok(Some(raw)) => raw,
                Ok(None) => String::from(QUIT),
                Err(error) => {
                    warn!(
                        event_name = "cli.form.input_failed",
                        submission_id = %id,
                        error = %error,
                        "could not read input; saving and stopping"
                    );
                    String::from(QUIT)
                }
            };

            match parse_input(field, &raw) {
                FieldInput::Keep => {}
                FieldInput::Value(value) => editor.set_answer(field_id, value),
                FieldInput::Back => {
                    editor.previous().await?;
                    continue 'questions;
                }
                FieldInput::Quit => {
                    let progress = editor.save().await?;
                    return Ok(FormWalk::Paused { progress });
                }
            }
        }

        match editor.next().await? {
            StepOutcome::Blocked { missing } => {
                prompt.say(&format!("required: {}", missing.join(", ")));
            }
            StepOutcome::Advanced { .. } => {}
            StepOutcome::Finished { pdf_url, progress } => {
                info!(
                    event_name = "cli.form.finished",
                    submission_id = %id,
                    progress,
                    "form completed"
                );
                return Ok(FormWalk::Finished { pdf_url, progress });
            }
        }
    }
}

async fn download_pdf(
    backend: &HttpBackend,
    config: &AppConfig,
    id: &SubmissionId,
    pdf_url: &str,
) -> Result<String, ApplicationError> {
    let bytes = backend.client().download(pdf_url).await?;
    let artifact = ExportArtifact {
        filename: format!("{id}.pdf"),
        format: ExportFormat::Pdf,
        mime_type: ExportFormat::Pdf.mime_type(),
        bytes,
    };
    let path = write_artifact(&artifact, &config.export.output_dir).await.map_err(export_error)?;
    Ok(path.display().to_string())
}

fn describe_field(field_id: &str, field: &FormField, current: Option<&AnswerValue>) -> String {
    let mut label = field.label.clone().unwrap_or_else(|| field_id.to_string());
    if field.required {
        label.push_str(" *");
    }
    match field.field_type {
        FieldType::Checkbox => label.push_str(" [y/n]"),
        FieldType::Radio | FieldType::Dropdown if !field.options.is_empty() => {
            let options: Vec<String> = field
                .options
                .iter()
                .enumerate()
                .map(|(index, option)| format!("{}) {option}", index + 1))
                .collect();
            label.push_str(&format!(" [{}]", options.join(", ")));
        }
        _ => {}
    }
    match current {
        Some(AnswerValue::Text(text)) if !text.is_empty() => {
            label.push_str(&format!(" ({text})"));
        }
        Some(AnswerValue::Bool(checked)) => {
            label.push_str(if *checked { " (yes)" } else { " (no)" });
        }
        Some(AnswerValue::Number(number)) => label.push_str(&format!(" ({number})")),
        _ => {}
    }
    label
}

fn parse_input(field: &FormField, raw: &str) -> FieldInput {
    let input = raw.trim();
    match input {
        "" => return FieldInput::Keep,
        BACK => return FieldInput::Back,
        QUIT => return FieldInput::Quit,
        _ => {}
    }

    match field.field_type {
        FieldType::Checkbox => {
            let checked =
                matches!(input.to_ascii_lowercase().as_str(), "y" | "yes" | "true" | "x" | "1");
            FieldInput::Value(AnswerValue::Bool(checked))
        }
        FieldType::Radio | FieldType::Dropdown => {
            let chosen = input
                .parse::<usize>()
                .ok()
                .and_then(|index| index.checked_sub(1))
                .and_then(|index| field.options.get(index))
                .cloned()
                .unwrap_or_else(|| input.to_string());
            FieldInput::Value(AnswerValue::Text(chosen))
        }
        FieldType::Text => FieldInput::Value(AnswerValue::Text(input.to_string())),
    }
}
