//! Integration tests for the reqwest-backed HTTP transport.

use std::time::Duration;

use serde_json::json;
use valbridge_transport::{HttpRequest, HttpTransport, Method, ReqwestTransport, TransportError};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_get_passes_headers_and_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chat/v4/presences"))
        .and(header("authorization", "Basic abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"presences": []})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new().expect("client");
    let resp = transport
        .send(
            HttpRequest::get(format!("{}/chat/v4/presences", server.uri()))
                .header("Authorization", "Basic abc"),
        )
        .await
        .expect("response");

    assert!(resp.is_ok());
    assert_eq!(resp.json_body().expect("json")["presences"], json!([]));
}

#[tokio::test]
async fn test_error_statuses_are_not_transport_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "7")
                .set_body_string("slow down"),
        )
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new().expect("client");
    let resp = transport
        .send(HttpRequest::get(format!("{}/busy", server.uri())))
        .await
        .expect("429 is still a response");

    assert_eq!(resp.status, 429);
    assert_eq!(resp.retry_after_secs(), Some(7));
    assert_eq!(resp.body, "slow down");
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/parties/v1/parties/p1/queue"))
        .and(body_json(json!({"queueId": "competitive"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new().expect("client");
    let resp = transport
        .send(
            HttpRequest::new(
                Method::Post,
                format!("{}/parties/v1/parties/p1/queue", server.uri()),
            )
            .json(json!({"queueId": "competitive"})),
        )
        .await
        .expect("response");
    assert_eq!(resp.status, 200);
}

#[tokio::test]
async fn test_request_timeout_maps_to_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new().expect("client");
    let result = transport
        .send(HttpRequest::get(server.uri()).timeout(Duration::from_millis(100)))
        .await;
    assert_eq!(result, Err(TransportError::Timeout));
}
