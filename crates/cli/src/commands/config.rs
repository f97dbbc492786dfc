use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use regpilot_core::config::{AppConfig, LoadOptions};
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG};

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
    flag: Option<&'static str>,
}

pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = detect_config_path(options.config_path.as_deref());
    let flags = FlagSources::from(&options);
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG,
            )
        }
    };
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields = [
        Field {
            key: "api.base_url",
            value: config.api.base_url.clone(),
            env_keys: &["REGPILOT_API_BASE_URL"],
            flag: flags.base_url,
        },
        Field {
            key: "api.timeout_secs",
            value: config.api.timeout_secs.to_string(),
            env_keys: &["REGPILOT_API_TIMEOUT_SECS"],
            flag: None,
        },
        Field {
            key: "api.user_id",
            value: config.api.user_id.clone().unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["REGPILOT_API_USER_ID"],
            flag: flags.user_id,
        },
        Field {
            key: "workflow.poll_interval_ms",
            value: config.workflow.poll_interval_ms.to_string(),
            env_keys: &["REGPILOT_WORKFLOW_POLL_INTERVAL_MS"],
            flag: flags.poll_interval,
        },
        Field {
            key: "workflow.max_poll_attempts",
            value: config
                .workflow
                .max_poll_attempts
                .map(|attempts| attempts.to_string())
                .unwrap_or_else(|| "<unbounded>".to_string()),
            env_keys: &["REGPILOT_WORKFLOW_MAX_POLL_ATTEMPTS"],
            flag: None,
        },
        Field {
            key: "workflow.fallback",
            value: format!("{:?}", config.workflow.fallback).to_ascii_lowercase(),
            env_keys: &["REGPILOT_WORKFLOW_FALLBACK"],
            flag: flags.fallback,
        },
        Field {
            key: "export.output_dir",
            value: config.export.output_dir.display().to_string(),
            env_keys: &["REGPILOT_EXPORT_OUTPUT_DIR"],
            flag: flags.output_dir,
        },
        Field {
            key: "export.default_format",
            value: config.export.default_format.to_string(),
            env_keys: &["REGPILOT_EXPORT_DEFAULT_FORMAT"],
            flag: None,
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["REGPILOT_LOGGING_LEVEL", "REGPILOT_LOG_LEVEL"],
            flag: flags.log_level,
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format).to_ascii_lowercase(),
            env_keys: &["REGPILOT_LOGGING_FORMAT", "REGPILOT_LOG_FORMAT"],
            flag: None,
        },
    ];

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    for field in &fields {
        let source = field_source(field, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult::success("config", lines.join("\n"))
}

#[derive(Default)]
struct FlagSources {
    base_url: Option<&'static str>,
    user_id: Option<&'static str>,
    poll_interval: Option<&'static str>,
    fallback: Option<&'static str>,
    output_dir: Option<&'static str>,
    log_level: Option<&'static str>,
}

impl From<&LoadOptions> for FlagSources {
    fn from(options: &LoadOptions) -> Self {
        let overrides = &options.overrides;
        Self {
            base_url: overrides.api_base_url.as_ref().map(|_| "--base-url"),
            user_id: overrides.api_user_id.as_ref().map(|_| "--user-id"),
            poll_interval: overrides.poll_interval_ms.map(|_| "--poll-interval-ms"),
            fallback: overrides.fallback.map(|_| "--fallback"),
            output_dir: overrides.output_dir.as_ref().map(|_| "--output-dir"),
            log_level: overrides.log_level.as_ref().map(|_| "--log-level"),
        }
    }
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("regpilot.toml"), PathBuf::from("config/regpilot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    field: &Field,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(flag) = field.flag {
        return format!("flag ({flag})");
    }

    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, field.key) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
