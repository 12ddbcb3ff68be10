//! REST transport abstraction for mutations and the initial snapshot fetch.
//!
//! Implementations:
//! - `HttpRest` - reqwest against the real backend
//! - `InMemoryRest` - canned responses and failure injection, for testing
//!
//! Any non-2xx response is uniformly a failure; its status line becomes the
//! surfaced reason. There is deliberately no request timeout and no retry:
//! failed calls surface once and the caller re-invokes.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Error)]
pub enum RestError {
    /// Non-2xx response; carries the status line (e.g. "500 Internal Server Error").
    #[error("{0}")]
    Status(String),

    /// Transport-level failure before any status was received.
    #[error("{0}")]
    Network(String),
}

pub type Result<T> = std::result::Result<T, RestError>;

/// Request/response transport to the backend.
#[async_trait]
pub trait RestTransport: Send + Sync {
    /// GET a JSON body.
    async fn get_json(&self, path: &str) -> Result<Value>;

    /// POST a JSON body. Success needs no response body.
    async fn post_json(&self, path: &str, body: Value) -> Result<()>;

    /// PUT a JSON body. Success needs no response body.
    async fn put_json(&self, path: &str, body: Value) -> Result<()>;

    /// DELETE a resource.
    async fn delete(&self, path: &str) -> Result<()>;
}

/// reqwest-backed transport against a fixed base URL.
pub struct HttpRest {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRest {
    /// Create a transport for the given base URL (e.g. `http://localhost:8000`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn check_status(response: &reqwest::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(RestError::Status(status.to_string()))
        }
    }
}

impl From<reqwest::Error> for RestError {
    fn from(e: reqwest::Error) -> Self {
        RestError::Network(e.to_string())
    }
}

#[async_trait]
impl RestTransport for HttpRest {
    async fn get_json(&self, path: &str) -> Result<Value> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::check_status(&response)?;
        Ok(response.json().await?)
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<()> {
        let response = self.client.post(self.url(path)).json(&body).send().await?;
        Self::check_status(&response)
    }

    async fn put_json(&self, path: &str, body: Value) -> Result<()> {
        let response = self.client.put(self.url(path)).json(&body).send().await?;
        Self::check_status(&response)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let response = self.client.delete(self.url(path)).send().await?;
        Self::check_status(&response)
    }
}

/// One request observed by `InMemoryRest`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

/// In-memory transport for testing.
///
/// GETs are answered from canned responses; mutations succeed unless a
/// failure has been injected. Every request is recorded.
#[derive(Default)]
pub struct InMemoryRest {
    responses: Mutex<HashMap<String, Value>>,
    fail_next: Mutex<Option<RestError>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl InMemoryRest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the canned response for a GET path.
    pub fn set_response(&self, path: &str, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_string(), body);
    }

    /// Make every following request fail with the given error until cleared.
    pub fn fail_with(&self, error: RestError) {
        *self.fail_next.lock().unwrap() = Some(error);
    }

    /// Stop injected failures.
    pub fn heal(&self) {
        *self.fail_next.lock().unwrap() = None;
    }

    /// All requests seen so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str, path: &str, body: Option<Value>) -> Result<()> {
        debug!("InMemoryRest: {} {}", method, path);
        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            path: path.to_string(),
            body,
        });
        match self.fail_next.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RestTransport for InMemoryRest {
    async fn get_json(&self, path: &str) -> Result<Value> {
        self.record("GET", path, None)?;
        self.responses
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| RestError::Status("404 Not Found".to_string()))
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<()> {
        self.record("POST", path, Some(body))
    }

    async fn put_json(&self, path: &str, body: Value) -> Result<()> {
        self.record("PUT", path, Some(body))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.record("DELETE", path, None)
    }
}
