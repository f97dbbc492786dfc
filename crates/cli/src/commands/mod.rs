pub mod assist;
pub mod config;
pub mod docprep;
pub mod export;
pub mod form;
pub mod register;
pub mod submissions;
pub mod validate;

use std::future::Future;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use regpilot_client::{ApiClient, HttpBackend};
use regpilot_core::config::AppConfig;
use regpilot_core::ApplicationError;
use regpilot_export::ExportError;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_APPLICATION: u8 = 4;
pub const EXIT_INPUT: u8 = 5;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            correlation_id: None,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            correlation_id: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Maps a controller error to a user-safe message tagged with a fresh correlation id.
    pub fn from_error(command: &str, error: ApplicationError) -> Self {
        let correlation_id = Uuid::new_v4().to_string();
        let error_class = error.class();
        let detail = error.to_string();
        warn!(
            event_name = "cli.command.failed",
            command,
            correlation_id = %correlation_id,
            error_class,
            error = %detail,
            "command failed"
        );

        let interface = error.into_interface(correlation_id.clone());
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: format!("{} ({detail})", interface.user_message()),
            correlation_id: Some(correlation_id),
        };
        Self { exit_code: EXIT_APPLICATION, output: serialize_payload(payload) }
    }

    pub fn input_error(command: &str, message: impl Into<String>) -> Self {
        Self::failure(command, "input", message, EXIT_INPUT)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Runs an async command body on a fresh current-thread runtime.
pub fn block_on<F>(command: &str, future: F) -> CommandResult
where
    F: Future<Output = CommandResult>,
{
    match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime.block_on(future),
        Err(error) => CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME,
        ),
    }
}

pub fn connect(config: &AppConfig) -> Result<Arc<HttpBackend>, ApplicationError> {
    let client =
        ApiClient::new(&config.api.base_url, Duration::from_secs(config.api.timeout_secs))?;
    Ok(Arc::new(HttpBackend::new(Arc::new(client))))
}

pub(crate) async fn read_input(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("could not read `{}`", path.display()))
}

pub(crate) fn export_error(error: ExportError) -> ApplicationError {
    ApplicationError::Export(error.to_string())
}

/// Line-oriented prompting, so interactive commands can be driven from tests.
pub trait Prompt {
    fn say(&mut self, line: &str);
    /// `None` on end of input.
    fn ask(&mut self, question: &str) -> io::Result<Option<String>>;
}

/// Prompts on stderr and reads answers from stdin.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn say(&mut self, line: &str) {
        eprintln!("{line}");
    }

    fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        let mut stderr = io::stderr();
        write!(stderr, "{question}: ")?;
        stderr.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}
