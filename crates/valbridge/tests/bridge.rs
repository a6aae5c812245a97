//! Integration tests for the `Bridge` facade over scripted transports.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use valbridge::prelude::*;
use valbridge::session::TOKEN_PATH;
use valbridge::transport::HttpResponse;
use valbridge::transport::mock::{ScriptedConnector, ScriptedTransport};

// -- Helpers --------------------------------------------------------------

type TestBridge = Bridge<ScriptedTransport, ScriptedConnector>;

fn descriptor(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("valbridge-bridge-{}-{name}", std::process::id()));
    std::fs::write(&path, "Riot Client:42:5123:hunter2:https").unwrap();
    path
}

fn token() -> HttpResponse {
    HttpResponse::json(200, &json!({"accessToken": "a", "token": "j", "subject": "self-1"}))
}

fn bridge(name: &str, transport: &ScriptedTransport, connector: &ScriptedConnector) -> TestBridge {
    BridgeBuilder::new()
        .descriptor_path(descriptor(name))
        .credential_config(
            CredentialConfig::default()
                .with_client_log_path(None)
                .with_region(Region::new("eu", "eu")),
        )
        .build_with(transport.clone(), connector.clone())
        .unwrap()
}

// -- Tests ----------------------------------------------------------------

#[tokio::test]
async fn test_build_performs_no_io_and_start_fetches_credentials() {
    let transport = ScriptedTransport::new();
    transport.always(TOKEN_PATH, token());
    let bridge = bridge("start", &transport, &ScriptedConnector::new());
    assert!(transport.requests().is_empty());

    bridge.start();
    for _ in 0..100 {
        if bridge.credentials().cached().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(bridge.credentials().subject_id().as_deref(), Some("self-1"));
    let request = &transport.requests()[0];
    // Startup uses the short fast-mode timeout.
    assert_eq!(request.timeout, Some(Duration::from_secs(2)));
}

#[tokio::test]
async fn test_self_presence_decodes_own_record() {
    let transport = ScriptedTransport::new();
    transport.always(TOKEN_PATH, token());
    let blob = PresenceCodec
        .encode(&DecodedPresence {
            session_state: Some(SessionState::Pregame),
            party_id: Some("party-9".into()),
            party_size: 3,
            queue_id: Some("competitive".into()),
            is_valid: true,
        })
        .unwrap();
    transport.push(
        "/chat/v4/presences",
        HttpResponse::json(
            200,
            &json!({"presences": [
                {"puuid": "someone", "product": "valorant", "private": blob},
                {"puuid": "self-1", "product": "valorant", "private": blob},
            ]}),
        ),
    );
    let bridge = bridge("presence", &transport, &ScriptedConnector::new());

    let presence = bridge.self_presence().await.unwrap().expect("own presence");
    assert_eq!(presence.session_state, Some(SessionState::Pregame));
    assert_eq!(presence.party_id.as_deref(), Some("party-9"));
    assert_eq!(presence.party_size, 3);
    assert!(presence.is_valid);
}

#[tokio::test]
async fn test_fetch_errors_convert_to_bridge_error() {
    let transport = ScriptedTransport::new();
    let bridge = BridgeBuilder::new()
        .descriptor_path(std::env::temp_dir().join("valbridge-bridge-absent"))
        .build_with(transport, ScriptedConnector::new())
        .unwrap();

    let err = bridge
        .fetch(EndpointRequest::party("/mmr/v1/players/self-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Endpoint(EndpointError::Unauthorized)));
}

#[tokio::test(start_paused = true)]
async fn test_local_failure_hook_reaches_host() {
    let transport = ScriptedTransport::new();
    transport.always("/chat/v1/session", HttpResponse::new(503, ""));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let bridge = BridgeBuilder::new()
        .descriptor_path(descriptor("hook"))
        .on_local_failure(move |failure| {
            let _ = tx.send(failure);
        })
        .build_with(transport, ScriptedConnector::new())
        .unwrap();

    let reply = bridge.fetch(EndpointRequest::local("/chat/v1/session")).await.unwrap();
    assert!(reply.is_none());
    let failure = rx.recv().await.expect("hook fired");
    assert_eq!(failure.path, "/chat/v1/session");
    assert_eq!(failure.attempts, 5);
}

#[tokio::test(start_paused = true)]
async fn test_await_state_change_goes_through_watcher() {
    let transport = ScriptedTransport::new();
    transport.always(TOKEN_PATH, token());
    let connector = ScriptedConnector::new();
    let blob = PresenceCodec
        .encode(&DecodedPresence {
            session_state: Some(SessionState::InGame),
            is_valid: true,
            ..DecodedPresence::default()
        })
        .unwrap();
    connector.session_held_open([json!([
        8,
        "OnJsonApiEvent_chat_v4_presences",
        {"uri": "/chat/v4/presences", "data": {"presences": [
            {"puuid": "self-1", "product": "valorant", "private": blob}
        ]}}
    ])
    .to_string()]);
    let bridge = bridge("watch", &transport, &connector);

    let outcome = bridge.await_state_change(&SessionState::Menus).await;
    assert_eq!(outcome, WatchOutcome::Changed(SessionState::InGame));
}

#[tokio::test]
async fn test_shutdown_is_terminal_for_watches() {
    let transport = ScriptedTransport::new();
    transport.always(TOKEN_PATH, token());
    let connector = ScriptedConnector::new();
    let bridge = bridge("shutdown", &transport, &connector);
    bridge.start();

    bridge.shutdown();
    let outcome = bridge.await_state_change(&SessionState::Menus).await;
    assert_eq!(outcome, WatchOutcome::Disconnected);
    assert_eq!(connector.attempts(), 0);
}

// -- Reference data -------------------------------------------------------

struct CountingSource {
    loads: Arc<AtomicUsize>,
    fail: bool,
}

impl ReferenceSource for CountingSource {
    async fn load(&self) -> Result<ReferenceCatalog, BridgeError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BridgeError::Config("content service unreachable".into()));
        }
        let mut catalog = ReferenceCatalog::default();
        catalog.tiers.insert(24, "https://example.test/24.png".into());
        Ok(catalog)
    }
}

#[tokio::test]
async fn test_reference_cache_loads_once() {
    let loads = Arc::new(AtomicUsize::new(0));
    let cache = ReferenceCache::new(CountingSource {
        loads: Arc::clone(&loads),
        fail: false,
    });
    assert!(!cache.is_loaded());

    let first = cache.catalog().await;
    let second = cache.catalog().await;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.tier_icon(24), Some("https://example.test/24.png"));
    assert!(cache.is_loaded());
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reference_cache_falls_back_when_source_fails() {
    let loads = Arc::new(AtomicUsize::new(0));
    let cache = ReferenceCache::new(CountingSource {
        loads: Arc::clone(&loads),
        fail: true,
    });

    let catalog = cache.catalog().await;
    assert_eq!(catalog.map_name("/Game/Maps/Ascent/Ascent"), Some("Ascent"));
    cache.catalog().await;
    // A failed load is not retried.
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}
