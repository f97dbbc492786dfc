use std::path::Path;
use std::sync::Arc;

use regpilot_agent::{DocPrepAgent, DocPrepSettings};
use regpilot_client::HttpBackend;
use regpilot_core::config::AppConfig;
use regpilot_core::{ResultOrigin, ValidationOutcome};
use regpilot_export::ExportService;

use crate::commands::{connect, export_error, read_input, CommandResult};

pub async fn execute(config: &AppConfig, file: &Path, document_type: &str) -> CommandResult {
    let content = match read_input(file).await {
        Ok(content) => content,
        Err(error) => return CommandResult::input_error("validate", format!("{error:#}")),
    };

    let agent = match build_agent(config) {
        Ok(agent) => agent,
        Err(result) => return result,
    };
    match agent.validate_document(&content, document_type).await {
        Ok(outcome) => CommandResult::success("validate", summarize(&outcome)),
        Err(error) => CommandResult::from_error("validate", error),
    }
}

fn build_agent(config: &AppConfig) -> Result<DocPrepAgent<HttpBackend>, CommandResult> {
    let backend: Arc<HttpBackend> =
        connect(config).map_err(|error| CommandResult::from_error("validate", error))?;
    let exporter = ExportService::new()
        .map_err(|error| CommandResult::from_error("validate", export_error(error)))?;
    Ok(DocPrepAgent::new(backend, DocPrepSettings::from(&config.workflow), exporter))
}

fn summarize(outcome: &ValidationOutcome) -> String {
    let report = &outcome.report;
    let mut lines = vec![format!("compliance score: {:.1}", report.compliance_score)];
    if outcome.origin == ResultOrigin::Fallback {
        lines.push("note: placeholder report; the validation service was unavailable".to_string());
    }
    for issue in &report.issues {
        match &issue.section {
            Some(section) => lines.push(format!("[{}] {section}: {}", issue.severity, issue.message)),
            None => lines.push(format!("[{}] {}", issue.severity, issue.message)),
        }
    }
    lines.extend(report.recommendations.iter().map(|item| format!("recommendation: {item}")));
    lines.join("\n")
}
