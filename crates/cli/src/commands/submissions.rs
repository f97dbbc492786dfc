use regpilot_agent::SubmissionStore;
use regpilot_client::HttpBackend;
use regpilot_core::config::AppConfig;
use regpilot_core::{NewSubmission, SubmissionId};

use crate::commands::{connect, CommandResult};

pub async fn list(config: &AppConfig) -> CommandResult {
    let mut store = match open_store(config, "submissions.list") {
        Ok(store) => store,
        Err(result) => return result,
    };
    if let Err(error) = store.refresh_submissions().await {
        return CommandResult::from_error("submissions.list", error);
    }

    let active = store.active_submission().map(|submission| submission.id.clone());
    let lines: Vec<String> = store
        .submissions()
        .iter()
        .map(|submission| {
            let marker = if Some(&submission.id) == active.as_ref() { "*" } else { " " };
            format!(
                "{marker} {} [{}] {}% {} ({})",
                submission.id,
                submission.status.as_str(),
                submission.progress,
                submission.name,
                submission.submission_type
            )
        })
        .collect();

    if lines.is_empty() {
        CommandResult::success("submissions.list", "no submissions")
    } else {
        CommandResult::success("submissions.list", lines.join("\n"))
    }
}

pub async fn create(config: &AppConfig, new: NewSubmission) -> CommandResult {
    let mut store = match open_store(config, "submissions.create") {
        Ok(store) => store,
        Err(result) => return result,
    };
    store.create_new_submission();
    match store.create_submission(new).await {
        Ok(created) => CommandResult::success(
            "submissions.create",
            format!("created submission {} ({})", created.id, created.name),
        ),
        Err(error) => CommandResult::from_error("submissions.create", error),
    }
}

pub async fn delete(config: &AppConfig, id: SubmissionId) -> CommandResult {
    let mut store = match open_store(config, "submissions.delete") {
        Ok(store) => store,
        Err(result) => return result,
    };
    if let Err(error) = store.refresh_submissions().await {
        return CommandResult::from_error("submissions.delete", error);
    }
    match store.delete_submission(&id).await {
        Ok(()) => CommandResult::success("submissions.delete", format!("deleted submission {id}")),
        Err(error) => CommandResult::from_error("submissions.delete", error),
    }
}

fn open_store(
    config: &AppConfig,
    command: &str,
) -> Result<SubmissionStore<HttpBackend>, CommandResult> {
    let backend = connect(config).map_err(|error| CommandResult::from_error(command, error))?;
    Ok(SubmissionStore::new(backend, config.api.user_id.clone()))
}
