//! HTTP transport seam.
//!
//! [`Transport`] is the only thing in the crate that talks to the network,
//! and only the request coordinator calls it. [`HttpTransport`] is the
//! reqwest-backed production implementation; [`MockTransport`] replays
//! scripted replies and lets tests decide when each reply arrives.

use crate::config::ApiConfig;
use crate::error::RequestError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

/// Longest response body kept inside an [`RequestError::Http`].
const MAX_ERROR_BODY: usize = 512;

/// HTTP method of an API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// A single JSON API call, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    /// A POST with a JSON body.
    pub fn post<B: Serialize>(path: impl Into<String>, body: &B) -> Self {
        // Plain data structs always serialize; fall back to null rather than panic.
        let body = serde_json::to_value(body).unwrap_or(Value::Null);
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
        }
    }

    /// A POST without a body.
    pub fn post_empty(path: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: None,
        }
    }
}

impl std::fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Sends API requests and returns the decoded JSON body.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request. Non-2xx statuses, connection failures and
    /// malformed bodies are all reported as typed errors.
    async fn send(&self, request: ApiRequest) -> Result<Value, RequestError>;

    /// Whether dropping an in-flight `send` future actually aborts the call.
    fn supports_abort(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// reqwest transport
// ---------------------------------------------------------------------------

/// Production transport backed by `reqwest`.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl HttpTransport {
    /// Create a transport from the API section of the configuration.
    pub fn new(config: &ApiConfig) -> Result<Self, RequestError> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(10));
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder.build().map_err(|e| RequestError::Transport {
            message: format!("Failed to build HTTP client: {}", e),
        })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn map_send_error(&self, err: reqwest::Error) -> RequestError {
        if err.is_timeout() {
            RequestError::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            RequestError::Transport {
                message: format!("Request failed: {}", err),
            }
        }
    }

    /// Map a non-2xx status to an [`RequestError::Http`].
    fn map_http_error(status: reqwest::StatusCode, body: &str) -> RequestError {
        let mut body = body.trim().to_string();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        RequestError::Http {
            status: status.as_u16(),
            body,
        }
    }

    /// Parse a successful response body. An empty body decodes as `null`.
    fn parse_body(body: &str) -> Result<Value, RequestError> {
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(body).map_err(|e| RequestError::Decode {
            message: format!("Invalid JSON: {}", e),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, RequestError> {
        let url = self.url(&request.path);
        debug!(method = %request.method, url = %url, "Sending API request");

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &body));
        }

        Self::parse_body(&body)
    }

    fn supports_abort(&self) -> bool {
        // Dropping a reqwest future cancels the underlying request.
        true
    }
}

// ---------------------------------------------------------------------------
// Scripted transport
// ---------------------------------------------------------------------------

/// Releases a gated [`MockTransport`] reply.
pub struct Gate(oneshot::Sender<()>);

impl Gate {
    /// Let the held reply arrive.
    pub fn release(self) {
        let _ = self.0.send(());
    }
}

struct ScriptedReply {
    reply: Result<Value, RequestError>,
    gate: Option<oneshot::Receiver<()>>,
}

/// In-memory transport replaying scripted replies per request path.
///
/// Replies for the same path are consumed in FIFO order. A gated reply is
/// held until its [`Gate`] is released (or dropped), which lets tests make
/// an earlier request finish after a later one.
pub struct MockTransport {
    replies: Mutex<HashMap<String, VecDeque<ScriptedReply>>>,
    calls: Mutex<Vec<ApiRequest>>,
    abortable: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            abortable: false,
        }
    }

    /// Report abort support to the coordinator.
    pub fn with_abort_support(mut self, abortable: bool) -> Self {
        self.abortable = abortable;
        self
    }

    /// Queue an immediate reply for `path`.
    pub fn push_reply(&self, path: &str, reply: Result<Value, RequestError>) {
        self.enqueue(path, reply, None);
    }

    /// Queue a successful JSON reply for `path`.
    pub fn push_json(&self, path: &str, body: Value) {
        self.push_reply(path, Ok(body));
    }

    /// Queue an HTTP error reply for `path`.
    pub fn push_status(&self, path: &str, status: u16) {
        self.push_reply(
            path,
            Err(RequestError::Http {
                status,
                body: String::new(),
            }),
        );
    }

    /// Queue a reply that is held until the returned gate is released.
    pub fn push_gated(&self, path: &str, reply: Result<Value, RequestError>) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.enqueue(path, reply, Some(rx));
        Gate(tx)
    }

    fn enqueue(
        &self,
        path: &str,
        reply: Result<Value, RequestError>,
        gate: Option<oneshot::Receiver<()>>,
    ) {
        self.replies
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(ScriptedReply { reply, gate });
    }

    /// Every request received so far, in arrival order.
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of requests received for `path`.
    pub fn call_count(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.path == path)
            .count()
    }

    /// Total number of requests received.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, RequestError> {
        let scripted = {
            self.calls.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .get_mut(&request.path)
                .and_then(|queue| queue.pop_front())
        };

        let Some(ScriptedReply { reply, gate }) = scripted else {
            return Err(RequestError::Transport {
                message: format!("no scripted reply for {}", request),
            });
        };

        if let Some(gate) = gate {
            // A dropped gate releases the reply as well.
            let _ = gate.await;
        }
        reply
    }

    fn supports_abort(&self) -> bool {
        self.abortable
    }
}
