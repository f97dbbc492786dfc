use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::document::ExportFormat;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub workflow: WorkflowConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct WorkflowConfig {
    pub poll_interval_ms: u64,
    pub max_poll_attempts: Option<u32>,
    pub fallback: FallbackMode,
}

#[derive(Clone, Debug)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    pub default_format: ExportFormat,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// What to do when the backend fails a start-workflow or validate-document call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    Disabled,
    Mock,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub api_user_id: Option<String>,
    pub log_level: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub fallback: Option<FallbackMode>,
    pub output_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot open `{path}`: {source}")]
    Unreadable { path: PathBuf, source: std::io::Error },
    #[error("`{path}` is not valid TOML: {source}")]
    Malformed { path: PathBuf, source: toml::de::Error },
    #[error("config file `{0}` does not exist")]
    NotFound(PathBuf),
    #[error("`${{{var}}}` names an environment variable that is not set")]
    UnsetVariable { var: String },
    #[error("a `${{` placeholder is missing its closing brace")]
    UnclosedPlaceholder,
    #[error("`{key}` holds an unusable value `{value}`")]
    BadEnvValue { key: String, value: String },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_secs: 30,
                user_id: None,
            },
            workflow: WorkflowConfig {
                poll_interval_ms: 3_000,
                max_poll_attempts: None,
                fallback: FallbackMode::Disabled,
            },
            export: ExportConfig {
                output_dir: PathBuf::from("."),
                default_format: ExportFormat::Pdf,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for FallbackMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "disabled" | "off" | "none" => Ok(Self::Disabled),
            "mock" => Ok(Self::Mock),
            other => Err(ConfigError::Validation(format!(
                "unsupported fallback mode `{other}` (expected disabled|mock)"
            ))),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    /// Builds the effective configuration: defaults, then the file, then `REGPILOT_*`
    /// variables, then explicit overrides.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match resolve_config_path(options.config_path.as_deref()) {
            Some(path) => config.merge_file(read_patch(&path)?),
            None if options.require_file => {
                return Err(ConfigError::NotFound(
                    options.config_path.unwrap_or_else(|| PathBuf::from("regpilot.toml")),
                ));
            }
            None => {}
        }

        config.merge_env()?;
        config.merge_overrides(options.overrides);
        config.validate()?;
        Ok(config)
    }

    fn merge_file(&mut self, patch: ConfigPatch) {
        let ApiPatch { base_url, timeout_secs, user_id } = patch.api.unwrap_or_default();
        assign(&mut self.api.base_url, base_url);
        assign(&mut self.api.timeout_secs, timeout_secs);
        assign(&mut self.api.user_id, user_id.map(Some));

        let WorkflowPatch { poll_interval_ms, max_poll_attempts, fallback } =
            patch.workflow.unwrap_or_default();
        assign(&mut self.workflow.poll_interval_ms, poll_interval_ms);
        assign(&mut self.workflow.max_poll_attempts, max_poll_attempts.map(Some));
        assign(&mut self.workflow.fallback, fallback);

        let ExportPatch { output_dir, default_format } = patch.export.unwrap_or_default();
        assign(&mut self.export.output_dir, output_dir);
        assign(&mut self.export.default_format, default_format);

        let LoggingPatch { level, format } = patch.logging.unwrap_or_default();
        assign(&mut self.logging.level, level);
        assign(&mut self.logging.format, format);
    }

    fn merge_env(&mut self) -> Result<(), ConfigError> {
        assign(&mut self.api.base_url, env_text("REGPILOT_API_BASE_URL"));
        assign(&mut self.api.timeout_secs, env_parsed("REGPILOT_API_TIMEOUT_SECS")?);
        assign(&mut self.api.user_id, env_text("REGPILOT_API_USER_ID").map(Some));

        assign(
            &mut self.workflow.poll_interval_ms,
            env_parsed("REGPILOT_WORKFLOW_POLL_INTERVAL_MS")?,
        );
        assign(
            &mut self.workflow.max_poll_attempts,
            env_parsed("REGPILOT_WORKFLOW_MAX_POLL_ATTEMPTS")?.map(Some),
        );
        assign(&mut self.workflow.fallback, env_parsed("REGPILOT_WORKFLOW_FALLBACK")?);

        let output_dir = env_text("REGPILOT_EXPORT_OUTPUT_DIR").map(PathBuf::from);
        assign(&mut self.export.output_dir, output_dir);
        assign(&mut self.export.default_format, env_parsed("REGPILOT_EXPORT_DEFAULT_FORMAT")?);

        // The short LOG_* spellings are accepted as aliases.
        assign(
            &mut self.logging.level,
            env_text("REGPILOT_LOGGING_LEVEL").or_else(|| env_text("REGPILOT_LOG_LEVEL")),
        );
        let format = match env_parsed("REGPILOT_LOGGING_FORMAT")? {
            Some(format) => Some(format),
            None => env_parsed("REGPILOT_LOG_FORMAT")?,
        };
        assign(&mut self.logging.format, format);

        Ok(())
    }

    fn merge_overrides(&mut self, overrides: ConfigOverrides) {
        let ConfigOverrides {
            api_base_url,
            api_user_id,
            log_level,
            poll_interval_ms,
            fallback,
            output_dir,
        } = overrides;
        assign(&mut self.api.base_url, api_base_url);
        assign(&mut self.api.user_id, api_user_id.map(Some));
        assign(&mut self.logging.level, log_level);
        assign(&mut self.workflow.poll_interval_ms, poll_interval_ms);
        assign(&mut self.workflow.fallback, fallback);
        assign(&mut self.export.output_dir, output_dir);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_api(&self.api)?;
        validate_workflow(&self.workflow)?;
        validate_export(&self.export)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("regpilot.toml"), PathBuf::from("config/regpilot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn assign<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::Unreadable { path: path.to_path_buf(), source })?;
    let expanded = expand_placeholders(&raw)?;
    toml::from_str(&expanded)
        .map_err(|source| ConfigError::Malformed { path: path.to_path_buf(), source })
}

/// Replaces every `${NAME}` with the value of environment variable `NAME`.
fn expand_placeholders(input: &str) -> Result<String, ConfigError> {
    let mut expanded = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("${") {
        expanded.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let close = after.find('}').ok_or(ConfigError::UnclosedPlaceholder)?;
        let name = &after[..close];
        let value =
            env::var(name).map_err(|_| ConfigError::UnsetVariable { var: name.to_string() })?;
        expanded.push_str(&value);
        rest = &after[close + 1..];
    }

    expanded.push_str(rest);
    Ok(expanded)
}

fn validate_api(api: &ApiConfig) -> Result<(), ConfigError> {
    let base_url = api.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "api.base_url must start with http:// or https://".to_string(),
        ));
    }

    if api.timeout_secs == 0 || api.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "api.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if api.user_id.as_ref().is_some_and(|value| value.trim().is_empty()) {
        return Err(ConfigError::Validation("api.user_id must not be blank when set".to_string()));
    }

    Ok(())
}

fn validate_workflow(workflow: &WorkflowConfig) -> Result<(), ConfigError> {
    if workflow.poll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "workflow.poll_interval_ms must be greater than zero".to_string(),
        ));
    }

    if workflow.max_poll_attempts == Some(0) {
        return Err(ConfigError::Validation(
            "workflow.max_poll_attempts must be greater than zero when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_export(export: &ExportConfig) -> Result<(), ConfigError> {
    if export.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("export.output_dir must not be empty".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

/// Blank values count as unset.
fn env_text(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn env_parsed<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    env_text(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|_| ConfigError::BadEnvValue { key: key.to_string(), value })
        })
        .transpose()
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    api: Option<ApiPatch>,
    workflow: Option<WorkflowPatch>,
    export: Option<ExportPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkflowPatch {
    poll_interval_ms: Option<u64>,
    max_poll_attempts: Option<u32>,
    fallback: Option<FallbackMode>,
}

#[derive(Debug, Default, Deserialize)]
struct ExportPatch {
    output_dir: Option<PathBuf>,
    default_format: Option<ExportFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
