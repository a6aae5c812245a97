//! Endpoint requests and replies.

use std::fmt;

use serde_json::Value;
use valbridge_transport::{HttpResponse, Method};

/// Which family of hosts a request targets. Each class has its own
/// authentication source and failure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    /// `glz-{region}-1.{shard}.a.pvp.net`: live match and pregame state.
    Regional,
    /// `pd.{shard}.a.pvp.net`: match history, MMR, party data.
    Party,
    /// `127.0.0.1:{port}`: the local client's own API.
    LocalService,
    /// Any absolute URL, sent with the credential headers.
    Unrestricted,
}

impl fmt::Display for EndpointClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Regional => "glz",
            Self::Party => "pd",
            Self::LocalService => "local",
            Self::Unrestricted => "custom",
        })
    }
}

/// One logical request.
///
/// `attempt` starts at 0 and is bumped by the client on every internal
/// retry; callers never need to set it.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointRequest {
    pub class: EndpointClass,
    /// Path on the class's host, or the full URL for
    /// [`EndpointClass::Unrestricted`].
    pub path: String,
    pub method: Method,
    pub body: Option<Value>,
    pub attempt: u32,
}

impl EndpointRequest {
    pub fn new(class: EndpointClass, path: impl Into<String>) -> Self {
        Self {
            class,
            path: path.into(),
            method: Method::Get,
            body: None,
            attempt: 0,
        }
    }

    pub fn regional(path: impl Into<String>) -> Self {
        Self::new(EndpointClass::Regional, path)
    }

    pub fn party(path: impl Into<String>) -> Self {
        Self::new(EndpointClass::Party, path)
    }

    pub fn local(path: impl Into<String>) -> Self {
        Self::new(EndpointClass::LocalService, path)
    }

    pub fn unrestricted(url: impl Into<String>) -> Self {
        Self::new(EndpointClass::Unrestricted, url)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets a JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A reply from any endpoint class.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    /// Parsed JSON body. A body that isn't JSON is kept as a string value;
    /// an empty body is `Null`.
    pub body: Value,
    pub retry_after: Option<u64>,
}

impl Reply {
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// The `errorCode` field of an error body.
    pub fn error_code(&self) -> Option<&str> {
        self.body.get("errorCode")?.as_str()
    }

    /// The `message` field of an error body.
    pub fn message(&self) -> Option<&str> {
        self.body.get("message")?.as_str()
    }
}

impl From<HttpResponse> for Reply {
    fn from(response: HttpResponse) -> Self {
        let retry_after = response.retry_after_secs();
        let body = response
            .json_body()
            .unwrap_or_else(|_| Value::String(response.body.clone()));
        Self {
            status: response.status,
            body,
            retry_after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reply_from_json_response() {
        let resp = HttpResponse::json(400, &json!({"errorCode": "BAD_CLAIMS", "message": "x"}))
            .with_header("Retry-After", "4");
        let reply = Reply::from(resp);
        assert_eq!(reply.error_code(), Some("BAD_CLAIMS"));
        assert_eq!(reply.message(), Some("x"));
        assert_eq!(reply.retry_after, Some(4));
        assert!(!reply.is_ok());
    }

    #[test]
    fn test_reply_from_text_response_keeps_text() {
        let reply = Reply::from(HttpResponse::new(502, "Bad Gateway"));
        assert_eq!(reply.body, Value::String("Bad Gateway".into()));
        assert_eq!(reply.error_code(), None);
    }

    #[test]
    fn test_request_builders() {
        let req = EndpointRequest::party("/parties/v1/players/me")
            .method(Method::Post)
            .json(json!({"a": 1}));
        assert_eq!(req.class, EndpointClass::Party);
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.attempt, 0);
        assert_eq!(EndpointClass::Regional.to_string(), "glz");
    }
}
