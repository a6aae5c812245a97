//! The credential manager: exchanges the session descriptor for a
//! short-lived credential bundle.
//!
//! # Lifecycle
//!
//! ```text
//! empty ──get_credentials()──→ populated ──invalidate()──→ empty
//!   ↑                              │
//!   └──────── refresh failed ──────┘ (nothing cached)
//! ```
//!
//! # Single flight
//!
//! Concurrent callers that all find the cache empty (or all force a
//! refresh) would otherwise each hit the token endpoint. Refreshes are
//! serialized behind `refresh_lock`, and every successful refresh bumps
//! `generation`. A caller that waited on the lock compares the generation
//! it observed before waiting with the current one: if it moved, someone
//! else already refreshed and the caller takes that result instead of
//! issuing its own request.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Deserialize;
use valbridge_protocol::SessionDescriptor;
use valbridge_transport::{HttpRequest, HttpResponse, HttpTransport};

use crate::auth::basic_authorization;
use crate::bundle::PLATFORM_HEADER;
use crate::client_log::{self, ClientLogInfo};
use crate::{CredentialBundle, DescriptorStore, Region};

/// Local token endpoint path.
pub const TOKEN_PATH: &str = "/entitlements/v1/token";

const CLIENT_LOG_RELATIVE_PATH: [&str; 4] = ["VALORANT", "Saved", "Logs", "ShooterGame.log"];

// ---------------------------------------------------------------------------
// CredentialConfig
// ---------------------------------------------------------------------------

/// Configuration for credential acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Basic-auth user for the local service.
    pub user: String,
    /// Client log scanned for the version and region. `None` skips the scan.
    pub client_log_path: Option<PathBuf>,
    /// Wait after a "token not ready" reply.
    pub not_ready_delay_ms: u64,
    /// Wait after an "invalid format" reply (normal mode only).
    pub invalid_format_delay_ms: u64,
    /// Wait after a transport failure before re-reading the descriptor.
    pub retry_delay_ms: u64,
    /// Token-endpoint attempts per call in normal mode.
    pub max_attempts: u32,
    /// Token-endpoint attempts per call in fast mode.
    pub fast_attempts: u32,
    /// Per-request timeout in normal mode.
    pub timeout_ms: u64,
    /// Per-request timeout in fast mode.
    pub fast_timeout_ms: u64,
    /// Overrides the region found in the client log.
    pub region: Option<Region>,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            user: "riot".into(),
            client_log_path: dirs::data_local_dir().map(|mut path| {
                path.extend(CLIENT_LOG_RELATIVE_PATH);
                path
            }),
            not_ready_delay_ms: 2_000,
            invalid_format_delay_ms: 5_000,
            retry_delay_ms: 2_000,
            max_attempts: 10,
            fast_attempts: 2,
            timeout_ms: 10_000,
            fast_timeout_ms: 2_000,
            region: None,
        }
    }
}

impl CredentialConfig {
    /// Clamps attempt bounds to at least one and keeps fast mode no slower
    /// than normal mode.
    pub fn validated(mut self) -> Self {
        self.max_attempts = self.max_attempts.max(1);
        self.fast_attempts = self.fast_attempts.clamp(1, self.max_attempts);
        self.fast_timeout_ms = self.fast_timeout_ms.min(self.timeout_ms);
        self
    }

    pub fn with_client_log_path(mut self, path: Option<PathBuf>) -> Self {
        self.client_log_path = path;
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    /// Sets all three retry delays at once.
    pub fn with_delays(mut self, delay: Duration) -> Self {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.not_ready_delay_ms = ms;
        self.invalid_format_delay_ms = ms;
        self.retry_delay_ms = ms;
        self
    }

    fn attempts(&self, fast_mode: bool) -> u32 {
        if fast_mode {
            self.fast_attempts
        } else {
            self.max_attempts
        }
    }

    fn timeout(&self, fast_mode: bool) -> Duration {
        Duration::from_millis(if fast_mode {
            self.fast_timeout_ms
        } else {
            self.timeout_ms
        })
    }
}

// ---------------------------------------------------------------------------
// Token endpoint replies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssuedToken {
    access_token: String,
    token: String,
    subject: String,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    #[serde(default)]
    message: String,
}

#[derive(Debug)]
enum TokenReply {
    Issued(IssuedToken),
    NotReady,
    InvalidFormat,
    Unexpected(u16),
}

fn classify(response: &HttpResponse) -> TokenReply {
    if response.is_ok() {
        if let Ok(token) = serde_json::from_str::<IssuedToken>(&response.body) {
            return TokenReply::Issued(token);
        }
    }
    let message = serde_json::from_str::<ErrorReply>(&response.body)
        .map(|reply| reply.message.to_ascii_lowercase())
        .unwrap_or_default();
    if message.contains("not ready") {
        TokenReply::NotReady
    } else if message.contains("invalid") && message.contains("format") {
        TokenReply::InvalidFormat
    } else {
        TokenReply::Unexpected(response.status)
    }
}

// ---------------------------------------------------------------------------
// CredentialManager
// ---------------------------------------------------------------------------

/// Produces credential bundles, refreshing only when necessary.
///
/// Never returns an error: when credentials can't be obtained the result
/// is the empty bundle and the reason is logged.
pub struct CredentialManager<T> {
    store: Arc<DescriptorStore>,
    transport: T,
    config: CredentialConfig,
    cached: Mutex<Option<CredentialBundle>>,
    /// Bumped after every completed refresh, successful or not.
    generation: AtomicU64,
    /// Outcome of the last completed refresh.
    last_failed: AtomicBool,
    last_fast: AtomicBool,
    refresh_lock: tokio::sync::Mutex<()>,
    /// Descriptor identity the connection warning was last logged for;
    /// 0 when re-armed.
    warned_identity: AtomicU64,
}

impl<T: HttpTransport> CredentialManager<T> {
    pub fn new(store: Arc<DescriptorStore>, transport: T, config: CredentialConfig) -> Self {
        Self {
            store,
            transport,
            config: config.validated(),
            cached: Mutex::new(None),
            generation: AtomicU64::new(0),
            last_failed: AtomicBool::new(false),
            last_fast: AtomicBool::new(false),
            refresh_lock: tokio::sync::Mutex::new(()),
            warned_identity: AtomicU64::new(0),
        }
    }

    /// The descriptor store this manager reads.
    pub fn store(&self) -> &Arc<DescriptorStore> {
        &self.store
    }

    pub fn config(&self) -> &CredentialConfig {
        &self.config
    }

    /// The transport used for token requests.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the cached bundle, or obtains a fresh one.
    ///
    /// `force_refresh` skips the cache. `fast_mode` is for startup: it uses
    /// short timeouts, makes at most two attempts, and gives up at the first
    /// transport failure or "invalid format" reply.
    ///
    /// Concurrent callers share one refresh: whoever waited behind it gets
    /// its outcome, including the empty bundle when it failed. A failed
    /// fast-mode refresh is not shared with normal-mode callers.
    pub async fn get_credentials(&self, force_refresh: bool, fast_mode: bool) -> CredentialBundle {
        let observed = self.generation.load(Ordering::Acquire);
        if !force_refresh {
            if let Some(bundle) = self.cached() {
                return bundle;
            }
        }

        let _guard = self.refresh_lock.lock().await;
        if self.generation.load(Ordering::Acquire) != observed {
            if let Some(bundle) = self.cached() {
                tracing::trace!("credentials refreshed by a concurrent caller");
                return bundle;
            }
            let last_fast = self.last_fast.load(Ordering::Acquire);
            if self.last_failed.load(Ordering::Acquire) && (fast_mode || !last_fast) {
                tracing::trace!("concurrent refresh failed; not repeating it");
                return CredentialBundle::empty();
            }
        }

        let bundle = self.refresh(fast_mode).await;
        if !bundle.is_empty() {
            *self.lock() = Some(bundle.clone());
            tracing::info!(subject = %bundle.subject_id, fast_mode, "credentials refreshed");
        }
        self.last_failed.store(bundle.is_empty(), Ordering::Release);
        self.last_fast.store(fast_mode, Ordering::Release);
        self.generation.fetch_add(1, Ordering::AcqRel);
        bundle
    }

    /// Clears the cached bundle. The next [`get_credentials`](Self::get_credentials)
    /// call fetches a new one.
    pub fn invalidate(&self) {
        if self.lock().take().is_some() {
            tracing::debug!("credentials invalidated");
        }
    }

    /// The cached bundle, if any.
    pub fn cached(&self) -> Option<CredentialBundle> {
        self.lock().clone()
    }

    /// Subject id of the cached bundle.
    pub fn subject_id(&self) -> Option<String> {
        self.lock().as_ref().map(|b| b.subject_id.clone())
    }

    async fn refresh(&self, fast_mode: bool) -> CredentialBundle {
        let attempts = self.config.attempts(fast_mode);
        for attempt in 1..=attempts {
            let descriptor = match self.store.read(true).await {
                Ok(Some(descriptor)) => descriptor,
                Ok(None) => {
                    tracing::debug!(attempt, "no session descriptor; client not running");
                    return CredentialBundle::empty();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "session descriptor unreadable");
                    return CredentialBundle::empty();
                }
            };
            let last = attempt == attempts;
            let delay = match self.transport.send(self.token_request(&descriptor, fast_mode)).await {
                Ok(response) => match classify(&response) {
                    TokenReply::Issued(token) => {
                        self.warned_identity.store(0, Ordering::Release);
                        return self.assemble(token).await;
                    }
                    TokenReply::NotReady => {
                        tracing::debug!(attempt, "entitlement token not ready yet");
                        self.config.not_ready_delay_ms
                    }
                    TokenReply::InvalidFormat if fast_mode => {
                        tracing::debug!("token endpoint reported invalid format; giving up in fast mode");
                        return CredentialBundle::empty();
                    }
                    TokenReply::InvalidFormat => {
                        tracing::debug!(attempt, "token endpoint reported invalid format");
                        self.config.invalid_format_delay_ms
                    }
                    TokenReply::Unexpected(status) => {
                        tracing::debug!(attempt, status, "unexpected token endpoint reply");
                        self.config.retry_delay_ms
                    }
                },
                Err(e) => {
                    if self.first_failure_for_identity() {
                        tracing::warn!(port = descriptor.port, error = %e, "cannot reach local client");
                    } else {
                        tracing::debug!(attempt, error = %e, "local client still unreachable");
                    }
                    if fast_mode {
                        return CredentialBundle::empty();
                    }
                    self.config.retry_delay_ms
                }
            };

            if !last {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        tracing::debug!(attempts, fast_mode, "credential attempts exhausted");
        CredentialBundle::empty()
    }

    /// `true` for the first connection failure since the descriptor last
    /// changed identity or a token was issued.
    fn first_failure_for_identity(&self) -> bool {
        let identity = self.store.identity();
        self.warned_identity.swap(identity, Ordering::AcqRel) != identity
    }

    fn token_request(&self, descriptor: &SessionDescriptor, fast_mode: bool) -> HttpRequest {
        HttpRequest::get(format!("https://127.0.0.1:{}{TOKEN_PATH}", descriptor.port))
            .header(
                "Authorization",
                basic_authorization(&self.config.user, &descriptor.password),
            )
            .timeout(self.config.timeout(fast_mode))
            .loopback()
    }

    async fn assemble(&self, token: IssuedToken) -> CredentialBundle {
        let log = self.scan_client_log().await;
        CredentialBundle {
            bearer_token: token.access_token,
            entitlement_jwt: token.token,
            subject_id: token.subject,
            client_version: log.version.unwrap_or_default(),
            platform_header: PLATFORM_HEADER.to_string(),
            region: self.config.region.clone().or(log.region),
        }
    }

    async fn scan_client_log(&self) -> ClientLogInfo {
        let Some(path) = &self.config.client_log_path else {
            return ClientLogInfo::default();
        };
        match tokio::fs::read(path).await {
            Ok(bytes) => client_log::scan(&String::from_utf8_lossy(&bytes)),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "client log unreadable");
                ClientLogInfo::default()
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<CredentialBundle>> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_issued_token() {
        let resp = HttpResponse::new(
            200,
            r#"{"accessToken":"a","token":"j","subject":"s","issuer":"x"}"#,
        );
        assert!(matches!(classify(&resp), TokenReply::Issued(t) if t.subject == "s"));
    }

    #[test]
    fn test_classify_not_ready() {
        let resp = HttpResponse::new(400, r#"{"message":"Entitlements token is not ready yet"}"#);
        assert!(matches!(classify(&resp), TokenReply::NotReady));
    }

    #[test]
    fn test_classify_invalid_format() {
        let resp = HttpResponse::new(400, r#"{"message":"Invalid URI format"}"#);
        assert!(matches!(classify(&resp), TokenReply::InvalidFormat));
    }

    #[test]
    fn test_classify_other_is_unexpected() {
        assert!(matches!(
            classify(&HttpResponse::new(500, "boom")),
            TokenReply::Unexpected(500)
        ));
        // A 200 without the token fields is not a success.
        assert!(matches!(
            classify(&HttpResponse::new(200, "{}")),
            TokenReply::Unexpected(200)
        ));
    }

    #[test]
    fn test_validated_clamps_attempts() {
        let config = CredentialConfig {
            max_attempts: 0,
            fast_attempts: 5,
            ..CredentialConfig::default()
        }
        .validated();
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.fast_attempts, 1);
    }

    #[tokio::test]
    async fn test_connection_warning_rearms_on_new_port_despite_other_readers() {
        let path = std::env::temp_dir()
            .join(format!("valbridge-cred-unit-{}-rearm", std::process::id()));
        std::fs::write(&path, "Riot Client:1:5000:pw:https").unwrap();
        let store = Arc::new(DescriptorStore::new(&path));
        let creds = CredentialManager::new(
            Arc::clone(&store),
            valbridge_transport::mock::ScriptedTransport::new(),
            CredentialConfig::default().with_client_log_path(None),
        );

        store.read(true).await.unwrap();
        assert!(creds.first_failure_for_identity());
        assert!(!creds.first_failure_for_identity());

        // The client restarts; another component reads the new descriptor
        // twice before the credential manager fails again.
        std::fs::write(&path, "Riot Client:2:6000:pw2:https").unwrap();
        store.read(true).await.unwrap();
        store.read(true).await.unwrap();
        assert!(creds.first_failure_for_identity());
        assert!(!creds.first_failure_for_identity());

        std::fs::remove_file(path).ok();
    }
}
