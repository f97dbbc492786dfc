use std::collections::BTreeMap;
use std::io;

use regpilot_agent::{DocPrepAgent, DocPrepSettings, WorkflowSnapshot};
use regpilot_core::config::AppConfig;
use regpilot_core::{
    ApplicationError, DocPrepBackend, DomainError, ExportFormat, ResultOrigin, WorkflowPhase,
};
use regpilot_export::{write_artifact, ExportService};
use tracing::info;

use crate::commands::{connect, export_error, CommandResult, Prompt};

#[derive(Clone, Debug)]
pub struct DocPrepArgs {
    pub document_type: String,
    pub attachment_type: String,
    pub format: Option<ExportFormat>,
    pub filename: Option<String>,
}

pub async fn execute(
    config: &AppConfig,
    args: DocPrepArgs,
    prompt: &mut dyn Prompt,
) -> CommandResult {
    let backend = match connect(config) {
        Ok(backend) => backend,
        Err(error) => return CommandResult::from_error("docprep", error),
    };
    let exporter = match ExportService::new() {
        Ok(exporter) => exporter,
        Err(error) => return CommandResult::from_error("docprep", export_error(error)),
    };
    let mut agent = DocPrepAgent::new(backend, DocPrepSettings::from(&config.workflow), exporter);

    match drive(&mut agent, config, args, prompt).await {
        Ok(result) => result,
        Err(error) => CommandResult::from_error("docprep", error),
    }
}

/// Runs one workflow to completion, asking for follow-up answers along the way.
pub async fn drive<B>(
    agent: &mut DocPrepAgent<B>,
    config: &AppConfig,
    args: DocPrepArgs,
    prompt: &mut dyn Prompt,
) -> Result<CommandResult, ApplicationError>
where
    B: DocPrepBackend + 'static,
{
    agent.start_workflow(&args.document_type, &args.attachment_type).await?;

    loop {
        let snapshot = agent.wait_until_settled().await;
        match snapshot.phase {
            WorkflowPhase::AwaitingUserInput => {
                let answers = match collect_answers(&snapshot, prompt) {
                    Ok(Some(answers)) => answers,
                    Ok(None) => {
                        agent.cancel()?;
                        return Ok(CommandResult::input_error(
                            "docprep",
                            "input ended before every follow-up question was answered",
                        ));
                    }
                    Err(error) => {
                        agent.cancel()?;
                        return Ok(CommandResult::input_error(
                            "docprep",
                            format!("could not read answer: {error}"),
                        ));
                    }
                };
                match agent.submit_additional_answers(answers).await {
                    Ok(_) => {}
                    Err(ApplicationError::Domain(DomainError::MissingRequiredFields { fields })) => {
                        prompt.say(&format!("still unanswered: {}", fields.join(", ")));
                    }
                    Err(error) => return Err(error),
                }
            }
            WorkflowPhase::Completed => break,
            WorkflowPhase::Error => {
                return Err(ApplicationError::Backend(
                    snapshot.error.unwrap_or_else(|| "document workflow failed".to_string()),
                ))
            }
            WorkflowPhase::Idle | WorkflowPhase::Starting | WorkflowPhase::Processing => {
                return Err(DomainError::InvariantViolation(format!(
                    "workflow stopped in phase {}",
                    snapshot.phase.as_str()
                ))
                .into())
            }
        }
    }

    let format = args.format.unwrap_or(config.export.default_format);
    let artifact = agent.export(format, args.filename)?;
    let path = write_artifact(&artifact, &config.export.output_dir).await.map_err(export_error)?;
    let snapshot = agent.snapshot();
    info!(
        event_name = "cli.docprep.completed",
        session_id = snapshot.session_id.as_ref().map(|id| id.0.as_str()).unwrap_or("none"),
        path = %path.display(),
        "document written"
    );

    let mut message = format!("wrote {} ({})", path.display(), artifact.mime_type);
    if snapshot.origin == ResultOrigin::Fallback {
        message.push_str("; placeholder document, the preparation service was unavailable");
    }
    Ok(CommandResult::success("docprep", message))
}

fn collect_answers(
    snapshot: &WorkflowSnapshot,
    prompt: &mut dyn Prompt,
) -> io::Result<Option<BTreeMap<String, String>>> {
    if let Some(message) = &snapshot.status_message {
        prompt.say(message);
    }

    let mut answers = BTreeMap::new();
    for question in &snapshot.questions {
        match prompt.ask(question)? {
            Some(answer) => {
                answers.insert(question.clone(), answer.trim().to_string());
            }
            None => return Ok(None),
        }
    }
    Ok(Some(answers))
}
