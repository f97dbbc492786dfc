use std::env;

use regpilot_core::config::AppConfig;
use regpilot_core::{AuthBackend, RegisterRequest};
use secrecy::SecretString;
use tracing::info;

use crate::commands::{block_on, connect, CommandResult};

pub const PASSWORD_ENV: &str = "REGPILOT_PASSWORD";

pub fn run(config: &AppConfig, email: &str, name: &str) -> CommandResult {
    let Some(password) = env::var(PASSWORD_ENV).ok().filter(|value| !value.is_empty()) else {
        return CommandResult::input_error(
            "register",
            format!("set {PASSWORD_ENV} to the new account's password"),
        );
    };
    let request = RegisterRequest::new(email, name, SecretString::from(password));
    block_on("register", execute(config, request))
}

pub async fn execute(config: &AppConfig, request: RegisterRequest) -> CommandResult {
    let backend = match connect(config) {
        Ok(backend) => backend,
        Err(error) => return CommandResult::from_error("register", error),
    };

    match backend.register(&request).await {
        Ok(account) => {
            info!(
                event_name = "cli.register.completed",
                email = %request.email,
                "account registered"
            );
            let id = account.id.unwrap_or_else(|| "<unassigned>".to_string());
            let message = account.message.unwrap_or_else(|| "account registered".to_string());
            CommandResult::success("register", format!("{message} (user id {id})"))
        }
        Err(error) => CommandResult::from_error("register", error),
    }
}
