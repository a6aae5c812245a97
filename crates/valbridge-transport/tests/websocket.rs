//! Integration tests for the WebSocket event-stream connector.
//!
//! These spin up a real tokio-tungstenite server on a random local port and
//! drive it with [`WebSocketConnector`], so the handshake headers and frame
//! handling are exercised over an actual socket.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
    use valbridge_transport::{
        EventStream, StreamConnector, StreamTarget, TransportError, WebSocketConnector,
    };

    /// Binds a listener on an OS-assigned port and returns it with its URL.
    async fn listen() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
        let addr = listener.local_addr().expect("should have addr");
        (listener, format!("ws://{addr}"))
    }

    fn target(url: &str, authorization: Option<&str>) -> StreamTarget {
        StreamTarget {
            url: url.to_string(),
            authorization: authorization.map(str::to_string),
            accept_invalid_certs: false,
        }
    }

    #[tokio::test]
    async fn test_connect_sends_authorization_and_exchanges_text() {
        let (listener, url) = listen().await;

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.expect("should accept");
            let mut seen_auth = None;
            let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                seen_auth = req
                    .headers()
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                Ok(resp)
            };
            let mut ws = tokio_tungstenite::accept_hdr_async(tcp, callback)
                .await
                .expect("handshake should succeed");

            let first = ws.next().await.expect("frame").expect("ok frame");
            ws.send(Message::Text(format!("echo:{}", first.to_text().unwrap_or_default()).into()))
                .await
                .expect("server send");
            ws.send(Message::Binary(b"[8,\"bin\"]".to_vec().into()))
                .await
                .expect("server send binary");
            ws.close(None).await.ok();
            seen_auth
        });

        let connector = WebSocketConnector::new();
        let mut stream = connector
            .connect(&target(&url, Some("Basic cmlvdDpzZWNyZXQ=")))
            .await
            .expect("should connect");
        assert!(stream.id().into_inner() > 0);

        stream.send_text("[5,\"OnJsonApiEvent\"]").await.expect("send");
        assert_eq!(
            stream.recv_text().await.expect("recv").as_deref(),
            Some("echo:[5,\"OnJsonApiEvent\"]")
        );
        assert_eq!(
            stream.recv_text().await.expect("recv").as_deref(),
            Some("[8,\"bin\"]")
        );
        assert_eq!(stream.recv_text().await.expect("recv after close"), None);

        let seen_auth = server.await.expect("server task");
        assert_eq!(seen_auth.as_deref(), Some("Basic cmlvdDpzZWNyZXQ="));
    }

    #[tokio::test]
    async fn test_connect_refused_is_connect_error() {
        // Bind then drop, so the port is very likely closed.
        let (listener, url) = listen().await;
        drop(listener);

        let result = WebSocketConnector::new().connect(&target(&url, None)).await;
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }

    #[tokio::test]
    async fn test_handshake_timeout() {
        // Accept TCP but never answer the WebSocket handshake.
        let (listener, url) = listen().await;
        let _server = tokio::spawn(async move {
            let (_tcp, _) = listener.accept().await.expect("should accept");
            std::future::pending::<()>().await;
        });

        let connector = WebSocketConnector::new().with_connect_timeout(Duration::from_millis(100));
        let result = connector.connect(&target(&url, None)).await;
        assert!(matches!(result, Err(TransportError::Timeout)));
    }

    #[tokio::test]
    async fn test_invalid_url_is_request_error() {
        let result = WebSocketConnector::new()
            .connect(&target("not a url", None))
            .await;
        assert!(matches!(result, Err(TransportError::Request(_))));
    }
}
