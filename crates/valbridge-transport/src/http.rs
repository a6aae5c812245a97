//! HTTP transport implementation using `reqwest`.

use crate::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};

/// A [`HttpTransport`] backed by two `reqwest` clients.
///
/// Remote requests use a client with normal certificate validation.
/// Loopback requests ([`HttpRequest::loopback`]) use a second client that
/// accepts the local service's self-signed certificate. Keeping them apart
/// means the relaxed validation can never leak onto a remote host.
///
/// Cloning is cheap: `reqwest::Client` is reference-counted internally.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    remote: reqwest::Client,
    loopback: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds both clients.
    pub fn new() -> Result<Self, TransportError> {
        let remote = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Tls(e.to_string()))?;
        let loopback = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| TransportError::Tls(e.to_string()))?;
        Ok(Self { remote, loopback })
    }

    fn client_for(&self, request: &HttpRequest) -> &reqwest::Client {
        if request.loopback {
            &self.loopback
        } else {
            &self.remote
        }
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client_for(&request).request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(map_send_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;

        tracing::trace!(url = %request.url, status, "http response received");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}
