//! Credentialed HTTP client with a one-shot session refresh on 401.
//!
//! Every request rides the same cookie jar. When a request comes back 401 and no
//! refresh is running, the client calls `POST /token/refresh` once and replays the
//! original request once. A 401 that arrives while another refresh is in flight fails
//! straight through to the caller; it is not queued behind the running refresh.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::ClientError;

pub const REFRESH_PATH: &str = "/token/refresh";

#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: None }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_json<T>(mut self, body: &T) -> Result<Self, ClientError>
    where
        T: Serialize + ?Sized,
    {
        self.body = Some(serde_json::to_value(body).map_err(ClientError::Encode)?);
        Ok(self)
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Clears the in-flight flag when the refresh attempt ends, however it ends.
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    refresh_in_flight: AtomicBool,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::InvalidBaseUrl(base_url));
        }

        let http = reqwest::Client::builder().cookie_store(true).timeout(timeout).build()?;
        Ok(Self { http, base_url, refresh_in_flight: AtomicBool::new(false) })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Sends `request`, refreshing the session and replaying once on a 401.
    pub async fn send(&self, request: &ApiRequest) -> Result<Response, ClientError> {
        let response = self.dispatch(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return ensure_success(request, response).await;
        }

        if self
            .refresh_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(
                event_name = "http.auth.refresh_in_flight",
                request_path = %request.path,
                "401 received while a session refresh is already running; failing through"
            );
            return Err(ClientError::Unauthorized { path: request.path.clone() });
        }

        let refreshed = {
            let _guard = RefreshGuard(&self.refresh_in_flight);
            self.refresh_session().await
        };
        if let Err(error) = refreshed {
            warn!(
                event_name = "http.auth.refresh_failed",
                request_path = %request.path,
                error = %error,
                "session refresh failed; surfacing original 401"
            );
            return Err(ClientError::Unauthorized { path: request.path.clone() });
        }

        info!(
            event_name = "http.auth.retrying",
            request_path = %request.path,
            "session refreshed; replaying request once"
        );
        let retried = self.dispatch(request).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized { path: request.path.clone() });
        }
        ensure_success(request, retried).await
    }

    pub async fn send_json<T>(&self, request: &ApiRequest) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(request).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|source| ClientError::Decode { path: request.path.clone(), source })
    }

    pub async fn send_unit(&self, request: &ApiRequest) -> Result<(), ClientError> {
        self.send(request).await.map(|_| ())
    }

    /// Calls the refresh endpoint directly; never goes through the 401 interceptor.
    pub async fn refresh_session(&self) -> Result<(), ClientError> {
        let request = ApiRequest::post(REFRESH_PATH);
        let response = self.dispatch(&request).await?;
        ensure_success(&request, response).await.map(|_| ())
    }

    /// Fetches a generated artifact, e.g. the URL returned by the PDF-fill endpoint.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        let request = ApiRequest::get(url);
        let response = self.send(&request).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<Response, ClientError> {
        let url = self.url_for(&request.path);
        let mut builder = self.http.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(
            event_name = "http.request.sent",
            method = %request.method,
            request_path = %request.path,
            "sending backend request"
        );
        Ok(builder.send().await?)
    }
}

async fn ensure_success(request: &ApiRequest, response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(error) => {
            warn!(
                event_name = "http.response.body_unreadable",
                request_path = %request.path,
                status = status.as_u16(),
                error = %error,
                "could not read error response body"
            );
            format!("response body unreadable: {error}")
        }
    };
    Err(ClientError::Status { path: request.path.clone(), status: status.as_u16(), body })
}
