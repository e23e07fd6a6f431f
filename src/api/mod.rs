//! REST API client for page data and admin CRUD
//!
//! Every endpoint answers with the same envelope:
//!
//! ```json
//! { "success": true, "data": { ... }, "message": null }
//! ```
//!
//! Callers only ever see `Result<Value, FetchError>`: a transport failure, a
//! bad status and `success: false` all end up as a `FetchError` that the
//! component turns into its own inline error state.

mod memory;

pub use memory::MemoryApi;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Longest error body kept in a `FetchError::Status` message
const MAX_ERROR_BODY: usize = 200;

// ─────────────────────────────────────────────────────────────────────────────
// Envelope & errors
// ─────────────────────────────────────────────────────────────────────────────

/// `{success, data?, message?}` wrapper around every API response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    /// `data` when the server reported success, `Rejected` otherwise
    pub fn into_result(self) -> Result<Option<T>, FetchError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(FetchError::Rejected {
                message: self
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "Request failed".to_string()),
            })
        }
    }
}

/// Why a request produced no data
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Connection, timeout or body read failure
    Network(String),
    /// Non-2xx status without a usable envelope
    Status { status: u16, message: String },
    /// Envelope with `success: false`
    Rejected { message: String },
    /// Response body was not an envelope
    Decode(String),
}

impl FetchError {
    /// Text shown to visitors in a component's inline error state
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message } => message.clone(),
            Self::Status { status: 404, .. } => "This content could not be found.".to_string(),
            _ => "Something went wrong while loading this content.".to_string(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Status { status, message } => write!(f, "HTTP {}: {}", status, message),
            Self::Rejected { message } => write!(f, "Request rejected: {}", message),
            Self::Decode(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

// ─────────────────────────────────────────────────────────────────────────────
// Api trait
// ─────────────────────────────────────────────────────────────────────────────

pub type ApiFuture = LocalBoxFuture<'static, Result<Value, FetchError>>;

/// The REST backend as components see it.
///
/// Paths are relative (`pages/home`, `admin/ministries/3`). Futures own
/// everything they need so a component can spawn them and outlive the call.
pub trait Api {
    fn get(&self, path: &str) -> ApiFuture;
    fn post(&self, path: &str, body: Value) -> ApiFuture;
    fn put(&self, path: &str, body: Value) -> ApiFuture;
    fn delete(&self, path: &str) -> ApiFuture;
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP implementation
// ─────────────────────────────────────────────────────────────────────────────

pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        tracing::debug!("API client for {} (timeout {:?})", base_url, timeout);

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str, body: Option<Value>) -> ApiFuture {
        let url = self.url(path);
        let mut req = self.client.request(method.clone(), &url);
        if let Some(body) = &body {
            req = req.json(body);
        }

        async move {
            tracing::debug!("{} {}", method, url);
            let response = req
                .send()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?;
            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?;

            let result = parse_response(status.as_u16(), &text);
            if let Err(e) = &result {
                tracing::warn!("{} {} failed: {}", method, url, e);
            }
            result
        }
        .boxed_local()
    }
}

impl Api for HttpApi {
    fn get(&self, path: &str) -> ApiFuture {
        self.request(Method::GET, path, None)
    }

    fn post(&self, path: &str, body: Value) -> ApiFuture {
        self.request(Method::POST, path, Some(body))
    }

    fn put(&self, path: &str, body: Value) -> ApiFuture {
        self.request(Method::PUT, path, Some(body))
    }

    fn delete(&self, path: &str) -> ApiFuture {
        self.request(Method::DELETE, path, None)
    }
}

/// Turn a status code and body into the envelope's data.
///
/// A parseable envelope wins over the status code, so an error response that
/// carries a `message` surfaces that message.
fn parse_response(status: u16, body: &str) -> Result<Value, FetchError> {
    let ok = (200..300).contains(&status);
    match serde_json::from_str::<Envelope>(body) {
        Ok(envelope) if ok || envelope.message.is_some() => {
            Ok(envelope.into_result()?.unwrap_or(Value::Null))
        }
        Ok(_) => Err(FetchError::Status {
            status,
            message: "No message".to_string(),
        }),
        Err(e) if ok => Err(FetchError::Decode(e.to_string())),
        Err(_) => Err(FetchError::Status {
            status,
            message: crate::util::truncate_utf8_safe(body.trim(), MAX_ERROR_BODY).to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_success_yields_data() {
        let env: Envelope = serde_json::from_value(json!({
            "success": true,
            "data": {"title": "Welcome"}
        }))
        .unwrap();
        assert_eq!(env.into_result().unwrap(), Some(json!({"title": "Welcome"})));
    }

    #[test]
    fn test_envelope_failure_is_rejected() {
        let env: Envelope = serde_json::from_value(json!({
            "success": false,
            "message": "Page not published"
        }))
        .unwrap();
        assert_eq!(
            env.into_result(),
            Err(FetchError::Rejected {
                message: "Page not published".to_string()
            })
        );
    }

    #[test]
    fn test_envelope_without_success_flag_is_failure() {
        let env: Envelope = serde_json::from_value(json!({"data": [1, 2]})).unwrap();
        let err = env.into_result().unwrap_err();
        assert_eq!(err.user_message(), "Request failed");
    }

    #[test]
    fn test_parse_response_paths() {
        assert_eq!(
            parse_response(200, r#"{"success":true,"data":[1]}"#),
            Ok(json!([1]))
        );
        assert_eq!(parse_response(200, r#"{"success":true}"#), Ok(Value::Null));
        assert!(matches!(
            parse_response(200, "<html>oops</html>"),
            Err(FetchError::Decode(_))
        ));
        assert_eq!(
            parse_response(403, r#"{"success":false,"message":"Sign in first"}"#),
            Err(FetchError::Rejected {
                message: "Sign in first".to_string()
            })
        );
        assert_eq!(
            parse_response(502, "Bad Gateway"),
            Err(FetchError::Status {
                status: 502,
                message: "Bad Gateway".to_string()
            })
        );
    }

    #[test]
    fn test_long_error_bodies_are_cut() {
        let body = "x".repeat(1000);
        match parse_response(500, &body) {
            Err(FetchError::Status { message, .. }) => assert_eq!(message.len(), MAX_ERROR_BODY),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_http_api_joins_paths() {
        let api = HttpApi::new("https://example.org/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(api.base_url(), "https://example.org/api");
        assert_eq!(api.url("/pages/home"), "https://example.org/api/pages/home");
        assert_eq!(api.url("pages/home"), "https://example.org/api/pages/home");
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            FetchError::Status {
                status: 404,
                message: String::new()
            }
            .user_message(),
            "This content could not be found."
        );
        assert_eq!(
            FetchError::Network("refused".into()).user_message(),
            "Something went wrong while loading this content."
        );
    }
}
