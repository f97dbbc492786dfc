use async_trait::async_trait;
use regpilot_core::backend::{AuthBackend, BackendResult};
use regpilot_core::{RegisterRequest, RegisteredAccount};
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::info;

use crate::api::HttpBackend;
use crate::http::ApiRequest;

pub const REGISTER_PATH: &str = "/auth/register";

#[derive(Serialize)]
struct RegisterBody<'a> {
    email: &'a str,
    name: &'a str,
    password: &'a str,
}

#[async_trait]
impl AuthBackend for HttpBackend {
    async fn register(&self, request: &RegisterRequest) -> BackendResult<RegisteredAccount> {
        request.validate()?;
        let body = RegisterBody {
            email: &request.email,
            name: &request.name,
            password: request.password.expose_secret(),
        };
        let http_request = ApiRequest::post(REGISTER_PATH).with_json(&body)?;
        let account: RegisteredAccount = self.client().send_json(&http_request).await?;
        info!(
            event_name = "auth.register.completed",
            request_path = REGISTER_PATH,
            account_id = account.id.as_deref().unwrap_or("unknown"),
            "account registered"
        );
        Ok(account)
    }

    async fn refresh(&self) -> BackendResult<()> {
        Ok(self.client().refresh_session().await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use regpilot_core::backend::AuthBackend;
    use regpilot_core::{ApplicationError, DomainError, RegisterRequest};
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::api::HttpBackend;
    use crate::http::ApiClient;

    fn backend_for(server: &MockServer) -> HttpBackend {
        HttpBackend::new(Arc::new(
            ApiClient::new(&server.uri(), Duration::from_secs(5)).expect("client"),
        ))
    }

    #[tokio::test]
    async fn register_posts_exposed_password_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .and(body_json(json!({
                "email": "qa@example.com",
                "name": "QA Lead",
                "password": "s3cret!"
            })))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"user_id": 42, "email": "qa@example.com"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let account = backend_for(&server)
            .register(&RegisterRequest::new(
                "qa@example.com",
                "QA Lead",
                SecretString::from("s3cret!".to_string()),
            ))
            .await
            .expect("registration succeeds");

        assert_eq!(account.id.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn invalid_registration_never_reaches_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let error = backend_for(&server)
            .register(&RegisterRequest::new("qa", "QA", SecretString::from("pw".to_string())))
            .await
            .expect_err("email is invalid");

        assert_eq!(
            error,
            ApplicationError::Domain(DomainError::MissingRequiredFields {
                fields: vec!["email".to_string()],
            })
        );
    }
}
