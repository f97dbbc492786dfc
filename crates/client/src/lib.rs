//! HTTP access to the regulatory-submission backend.
//!
//! [`http::ApiClient`] owns the cookie jar and the 401 refresh interceptor;
//! [`api::HttpBackend`] implements every backend port on top of it.

pub mod api;
pub mod auth;
pub mod error;
pub mod http;

pub use api::HttpBackend;
pub use error::ClientError;
pub use http::{ApiClient, ApiRequest};
