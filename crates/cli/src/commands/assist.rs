use std::path::PathBuf;

use regpilot_core::config::AppConfig;
use regpilot_core::{AssistantBackend, AssistantKind, AssistantRequest, ExportFormat};
use regpilot_export::{write_artifact, ExportRequest, ExportService};
use serde_json::Value;

use crate::commands::{connect, export_error, read_input, CommandResult};

#[derive(Clone, Debug)]
pub struct AssistArgs {
    pub kind: AssistantKind,
    pub input: PathBuf,
    pub report_type: Option<String>,
    /// When set, the reply is also written as an artifact in this format.
    pub export: Option<ExportFormat>,
}

pub async fn execute(config: &AppConfig, args: AssistArgs) -> CommandResult {
    let raw = match read_input(&args.input).await {
        Ok(raw) => raw,
        Err(error) => return CommandResult::input_error("assist", format!("{error:#}")),
    };
    let payload: Value = match serde_json::from_str(&raw) {
        Ok(payload) => payload,
        Err(error) => {
            return CommandResult::input_error(
                "assist",
                format!("`{}` is not valid JSON: {error}", args.input.display()),
            )
        }
    };
    if args.kind.requires_report_type() && args.report_type.is_none() {
        return CommandResult::input_error("assist", "this assistant needs --type");
    }

    let backend = match connect(config) {
        Ok(backend) => backend,
        Err(error) => return CommandResult::from_error("assist", error),
    };
    let request =
        AssistantRequest { kind: args.kind, report_type: args.report_type.clone(), payload };
    let reply = match backend.generate(&request).await {
        Ok(reply) => reply,
        Err(error) => return CommandResult::from_error("assist", error),
    };
    let markdown = reply.to_markdown();

    let Some(format) = args.export else {
        return CommandResult::success("assist", markdown);
    };
    let service = match ExportService::new() {
        Ok(service) => service,
        Err(error) => return CommandResult::from_error("assist", export_error(error)),
    };
    let mut export = ExportRequest::new(format, markdown);
    export.report_type = args.report_type;
    let written = match service.export_with_fallback(&export) {
        Ok(artifact) => write_artifact(&artifact, &config.export.output_dir).await,
        Err(error) => Err(error),
    };
    match written {
        Ok(path) => CommandResult::success("assist", format!("wrote {}", path.display())),
        Err(error) => CommandResult::from_error("assist", export_error(error)),
    }
}
