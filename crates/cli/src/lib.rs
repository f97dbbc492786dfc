pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use commands::{block_on, CommandResult, TerminalPrompt, EXIT_CONFIG};
use regpilot_core::config::{AppConfig, ConfigOverrides, FallbackMode, LoadOptions};
use regpilot_core::{AssistantKind, ExportFormat, NewSubmission, SubmissionId};

#[derive(Debug, Parser)]
#[command(
    name = "regpilot",
    about = "Regulatory submission workspace CLI",
    long_about = "Manage submissions, step through submission forms, run document preparation and export the results.",
    after_help = "Examples:\n  regpilot config\n  regpilot submissions list\n  regpilot docprep --document-type 510k --attachment-type device-description --format pdf"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    #[arg(
        long,
        global = true,
        help = "Config file (default: regpilot.toml or config/regpilot.toml)"
    )]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Backend origin, e.g. http://localhost:8000")]
    base_url: Option<String>,
    #[arg(long, global = true, help = "Scope submission listing to this user")]
    user_id: Option<String>,
    #[arg(long, global = true, help = "Workflow status poll interval in milliseconds")]
    poll_interval_ms: Option<u64>,
    #[arg(long, global = true, help = "Fallback policy when the backend fails: disabled|mock")]
    fallback: Option<FallbackMode>,
    #[arg(long, global = true, help = "Directory artifacts are written to")]
    output_dir: Option<PathBuf>,
    #[arg(long, global = true, help = "trace|debug|info|warn|error")]
    log_level: Option<String>,
}

impl GlobalArgs {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                api_base_url: self.base_url.clone(),
                api_user_id: self.user_id.clone(),
                log_level: self.log_level.clone(),
                poll_interval_ms: self.poll_interval_ms,
                fallback: self.fallback,
                output_dir: self.output_dir.clone(),
            },
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Register an account; the password is read from REGPILOT_PASSWORD")]
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
    },
    #[command(about = "List, create or delete submissions")]
    Submissions {
        #[command(subcommand)]
        action: SubmissionsCommand,
    },
    #[command(about = "Step through a submission's form interactively")]
    Form { submission_id: String },
    #[command(about = "Prepare a document with the backend workflow, then export it")]
    Docprep {
        #[arg(long)]
        document_type: String,
        #[arg(long)]
        attachment_type: String,
        #[arg(long, help = "pdf|doc|txt (default: export.default_format)")]
        format: Option<ExportFormat>,
        #[arg(long)]
        filename: Option<String>,
    },
    #[command(about = "Validate a document and print the compliance report")]
    Validate {
        file: PathBuf,
        #[arg(long)]
        document_type: String,
    },
    #[command(about = "Convert a Markdown file to pdf, doc or txt without contacting the backend")]
    Export {
        input: PathBuf,
        #[arg(long)]
        format: Option<ExportFormat>,
        #[arg(long)]
        report_type: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        filename: Option<String>,
    },
    #[command(
        about = "Run an AI assistant: form-questions, suggested-form, pre-submission, post-market"
    )]
    Assist {
        kind: AssistantKind,
        #[arg(long, help = "JSON payload file")]
        input: PathBuf,
        #[arg(long = "type", help = "Report type; required by pre-submission and post-market")]
        report_type: Option<String>,
        #[arg(long, help = "Also write the reply as an artifact in this format")]
        export: Option<ExportFormat>,
    },
}

#[derive(Debug, Subcommand)]
enum SubmissionsCommand {
    List,
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "device")]
        product_type: String,
        #[arg(long)]
        submission_type: String,
    },
    Delete {
        id: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let result = dispatch(cli.global.load_options(), cli.command);

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Loads configuration, installs logging and runs `command` against it.
fn with_config<F>(options: LoadOptions, command: F) -> CommandResult
where
    F: FnOnce(&AppConfig) -> CommandResult,
{
    match AppConfig::load(options) {
        Ok(config) => {
            logging::init_logging(&config);
            command(&config)
        }
        Err(error) => CommandResult::failure(
            "config",
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        ),
    }
}

fn dispatch(options: LoadOptions, command: Command) -> CommandResult {
    match command {
        Command::Config => commands::config::run(options),
        Command::Register { email, name } => {
            with_config(options, |config| commands::register::run(config, &email, &name))
        }
        Command::Submissions { action } => with_config(options, |config| match action {
            SubmissionsCommand::List => {
                block_on("submissions.list", commands::submissions::list(config))
            }
            SubmissionsCommand::Create { name, product_type, submission_type } => {
                let new = NewSubmission { name, product_type, submission_type, user_id: None };
                block_on("submissions.create", commands::submissions::create(config, new))
            }
            SubmissionsCommand::Delete { id } => block_on(
                "submissions.delete",
                commands::submissions::delete(config, SubmissionId(id)),
            ),
        }),
        Command::Form { submission_id } => with_config(options, |config| {
            let mut prompt = TerminalPrompt;
            block_on(
                "form",
                commands::form::execute(config, SubmissionId(submission_id), &mut prompt),
            )
        }),
        Command::Docprep { document_type, attachment_type, format, filename } => {
            let args = commands::docprep::DocPrepArgs {
                document_type,
                attachment_type,
                format,
                filename,
            };
            with_config(options, |config| {
                let mut prompt = TerminalPrompt;
                block_on("docprep", commands::docprep::execute(config, args, &mut prompt))
            })
        }
        Command::Validate { file, document_type } => with_config(options, |config| {
            block_on("validate", commands::validate::execute(config, &file, &document_type))
        }),
        Command::Export { input, format, report_type, title, filename } => {
            let args = commands::export::ExportArgs { input, format, report_type, title, filename };
            with_config(options, |config| block_on("export", commands::export::execute(config, args)))
        }
        Command::Assist { kind, input, report_type, export } => {
            let args = commands::assist::AssistArgs { kind, input, report_type, export };
            with_config(options, |config| block_on("assist", commands::assist::execute(config, args)))
        }
    }
}
