//! Transport abstraction layer for valbridge.
//!
//! Provides two seams that everything above talks through:
//!
//! - [`HttpTransport`] — one request in, one response out. Implemented by
//!   [`ReqwestTransport`].
//! - [`StreamConnector`] / [`EventStream`] — a persistent text-frame
//!   connection to the local event stream. Implemented by
//!   [`WebSocketConnector`].
//!
//! Retry policy lives above this layer; a transport makes exactly one
//! attempt per call.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — event-stream connector via `tokio-tungstenite`
//! - `test-util` — scripted in-memory fakes ([`mock`]) for downstream tests

#![allow(async_fn_in_trait)]

mod error;
mod http;
#[cfg(feature = "test-util")]
pub mod mock;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use http::ReqwestTransport;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnector, WebSocketEventStream};

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde_json::Value;

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// HTTP method of an [`HttpRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// A transport-agnostic HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Per-request timeout. `None` uses the transport's default.
    pub timeout: Option<Duration>,
    /// Loopback requests go to the local client, which serves a
    /// self-signed certificate; transports skip certificate validation for
    /// these and only these.
    pub loopback: bool,
}

impl HttpRequest {
    /// Creates a request with no headers, body, or timeout.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
            loopback: false,
        }
    }

    /// Shorthand for a `GET`.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Appends a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets a JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Marks the request as targeting the local client.
    pub fn loopback(mut self) -> Self {
        self.loopback = true;
        self
    }

    /// Looks up a header value (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A transport-agnostic HTTP response with the body kept as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Creates a response with a text body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Creates a response with a JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    /// Appends a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Looks up a header value (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// `true` for exactly `200 OK`. The game APIs use other 2xx codes for
    /// responses callers treat as failures.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// The `Retry-After` header in whole seconds, if present and numeric.
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.header("retry-after")?.trim().parse().ok()
    }

    /// Parses the body as JSON. An empty body parses as `Value::Null`.
    pub fn json_body(&self) -> Result<Value, serde_json::Error> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Sends one HTTP request and returns the response, whatever its status.
///
/// Non-2xx statuses are *not* errors at this layer: the endpoint policies
/// above need to see 404s, 429s, and error bodies. An `Err` means no
/// response was received at all.
///
/// The returned future must be `Send` so callers can run it on spawned
/// tasks (startup credential acquisition does).
pub trait HttpTransport: Send + Sync + 'static {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

// ---------------------------------------------------------------------------
// Event stream
// ---------------------------------------------------------------------------

/// Opaque identifier for an event-stream connection, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Where and how to open an event stream.
#[derive(Clone, PartialEq, Eq)]
pub struct StreamTarget {
    /// `wss://127.0.0.1:{port}` in production.
    pub url: String,
    /// Full `Authorization` header value, if any.
    pub authorization: Option<String>,
    /// Skip certificate validation (the local client's cert is self-signed).
    pub accept_invalid_certs: bool,
}

impl fmt::Debug for StreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamTarget")
            .field("url", &self.url)
            .field("authorization", &self.authorization.as_ref().map(|_| "<redacted>"))
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

/// Opens event-stream connections.
pub trait StreamConnector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Stream: EventStream;

    /// Opens one connection. No retries.
    fn connect(
        &self,
        target: &StreamTarget,
    ) -> impl Future<Output = Result<Self::Stream, TransportError>> + Send;
}

/// An open text-frame connection.
pub trait EventStream: Send + 'static {
    /// Sends one text frame.
    fn send_text(&mut self, text: &str)
    -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next text frame.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv_text(&mut self) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;

    /// Closes the connection.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
        assert_eq!(id.into_inner(), 7);
    }

    #[test]
    fn test_request_builder_sets_fields() {
        let req = HttpRequest::get("https://127.0.0.1:1/x")
            .header("Authorization", "Basic abc")
            .timeout(Duration::from_secs(2))
            .loopback();

        assert_eq!(req.method, Method::Get);
        assert_eq!(req.header_value("authorization"), Some("Basic abc"));
        assert_eq!(req.timeout, Some(Duration::from_secs(2)));
        assert!(req.loopback);
    }

    #[test]
    fn test_response_retry_after_parses_seconds() {
        let resp = HttpResponse::new(429, "").with_header("Retry-After", " 12 ");
        assert_eq!(resp.retry_after_secs(), Some(12));
        assert_eq!(HttpResponse::new(429, "").retry_after_secs(), None);
    }

    #[test]
    fn test_response_is_ok_only_for_200() {
        assert!(HttpResponse::new(200, "").is_ok());
        assert!(!HttpResponse::new(204, "").is_ok());
        assert!(!HttpResponse::new(404, "").is_ok());
    }

    #[test]
    fn test_response_json_body_empty_is_null() {
        assert_eq!(HttpResponse::new(200, " ").json_body().unwrap(), Value::Null);
        let resp = HttpResponse::json(200, &serde_json::json!({"a": 1}));
        assert_eq!(resp.json_body().unwrap()["a"], 1);
        assert!(HttpResponse::new(200, "{oops").json_body().is_err());
    }

    #[test]
    fn test_stream_target_debug_redacts_authorization() {
        let target = StreamTarget {
            url: "wss://127.0.0.1:1".into(),
            authorization: Some("Basic c2VjcmV0".into()),
            accept_invalid_certs: true,
        };
        assert!(!format!("{target:?}").contains("c2VjcmV0"));
    }
}
