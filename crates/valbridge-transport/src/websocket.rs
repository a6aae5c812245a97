//! Event-stream connector implementation using `tokio-tungstenite`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::{Connector, MaybeTlsStream};

use crate::{ConnectionId, EventStream, StreamConnector, StreamTarget, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Default time allowed for the TCP + TLS + WebSocket handshake.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A WebSocket-based [`StreamConnector`].
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    connect_timeout: Duration,
}

impl WebSocketConnector {
    /// Creates a connector with the default handshake timeout.
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Overrides the handshake timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamConnector for WebSocketConnector {
    type Stream = WebSocketEventStream;

    async fn connect(&self, target: &StreamTarget) -> Result<Self::Stream, TransportError> {
        let mut request = target
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        if let Some(auth) = &target.authorization {
            let value =
                HeaderValue::from_str(auth).map_err(|e| TransportError::Request(e.to_string()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let connector = if target.accept_invalid_certs {
            let tls = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .build()
                .map_err(|e| TransportError::Tls(e.to_string()))?;
            Some(Connector::NativeTls(tls))
        } else {
            None
        };

        let handshake =
            tokio_tungstenite::connect_async_tls_with_config(request, None, false, connector);
        let (ws, _response) = tokio::time::timeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, url = %target.url, "event stream connected");

        Ok(WebSocketEventStream { id, ws })
    }
}

/// A single event-stream connection over WebSocket.
///
/// Owned by exactly one watcher call, so no interior locking is needed:
/// every method takes `&mut self`.
pub struct WebSocketEventStream {
    id: ConnectionId,
    ws: WsStream,
}

impl EventStream for WebSocketEventStream {
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.ws
            .send(Message::Text(text.to_owned().into()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn recv_text(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => return Ok(Some(text)),
                    Err(_) => {
                        tracing::debug!(id = %self.id, "skipping non-utf8 binary frame");
                        continue;
                    }
                },
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.ws
            .close(None)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
