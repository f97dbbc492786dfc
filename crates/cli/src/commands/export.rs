use std::path::PathBuf;

use regpilot_core::config::AppConfig;
use regpilot_core::ExportFormat;
use regpilot_export::{write_artifact, ExportRequest, ExportService};

use crate::commands::{export_error, read_input, CommandResult};

#[derive(Clone, Debug)]
pub struct ExportArgs {
    pub input: PathBuf,
    pub format: Option<ExportFormat>,
    pub report_type: Option<String>,
    pub title: Option<String>,
    pub filename: Option<String>,
}

/// Offline conversion of a Markdown file; never touches the backend.
pub async fn execute(config: &AppConfig, args: ExportArgs) -> CommandResult {
    let content = match read_input(&args.input).await {
        Ok(content) => content,
        Err(error) => return CommandResult::input_error("export", format!("{error:#}")),
    };

    let service = match ExportService::new() {
        Ok(service) => service,
        Err(error) => return CommandResult::from_error("export", export_error(error)),
    };
    let request = ExportRequest {
        format: args.format.unwrap_or(config.export.default_format),
        content,
        filename: args.filename,
        report_type: args.report_type,
        title: args.title,
    };

    let artifact = match service.export_with_fallback(&request) {
        Ok(artifact) => artifact,
        Err(error) => return CommandResult::from_error("export", export_error(error)),
    };
    match write_artifact(&artifact, &config.export.output_dir).await {
        Ok(path) => CommandResult::success(
            "export",
            format!("wrote {} ({}) to {}", artifact.filename, artifact.mime_type, path.display()),
        ),
        Err(error) => CommandResult::from_error("export", export_error(error)),
    }
}
