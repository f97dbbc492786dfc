use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Account registration payload. The password never appears in `Debug` output.
#[derive(Clone, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: SecretString,
}

impl RegisterRequest {
    pub fn new(email: impl Into<String>, name: impl Into<String>, password: SecretString) -> Self {
        Self { email: email.into(), name: name.into(), password }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let mut missing = Vec::new();
        if !self.email.contains('@') {
            missing.push("email".to_string());
        }
        if self.name.trim().is_empty() {
            missing.push("name".to_string());
        }
        if self.password.expose_secret().is_empty() {
            missing.push("password".to_string());
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DomainError::MissingRequiredFields { fields: missing })
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredAccount {
    #[serde(default, alias = "user_id", deserialize_with = "super::optional_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::RegisterRequest;
    use crate::errors::DomainError;

    #[test]
    fn debug_output_redacts_password() {
        let request = RegisterRequest::new(
            "reviewer@example.com",
            "Reviewer",
            SecretString::from("hunter2".to_string()),
        );
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn validation_lists_every_missing_field() {
        let request = RegisterRequest::new("not-an-email", " ", SecretString::from(String::new()));
        assert_eq!(
            request.validate(),
            Err(DomainError::MissingRequiredFields {
                fields: vec!["email".to_string(), "name".to_string(), "password".to_string()],
            })
        );
    }
}
