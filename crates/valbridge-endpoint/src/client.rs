//! The endpoint client: one logical request, class-specific resilience.
//!
//! Every class runs as an explicit loop with an attempt counter:
//!
//! ```text
//! Dispatch → Send → Classify ─┬→ Return
//!                             ├→ Invalidate credentials, retry
//!                             ├→ Back off, retry
//!                             └→ Escalate (error or soft failure)
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use valbridge_protocol::{PRESENCE_URI, PresenceList};
use valbridge_session::{CredentialBundle, CredentialManager, basic_authorization};
use valbridge_transport::{HttpRequest, HttpTransport};

use crate::throttle::LogThrottle;
use crate::{EndpointClass, EndpointConfig, EndpointError, EndpointRequest, Reply};

/// User agent the game APIs expect.
pub const USER_AGENT: &str = "ShooterGame/13 Windows/10.0.19043.1.256.64bit";

/// Reported to the failure hook when the local service stayed unreachable
/// for every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalServiceFailure {
    pub path: String,
    pub attempts: u32,
}

type FailureHook = Arc<dyn Fn(LocalServiceFailure) + Send + Sync>;

/// What one local-service attempt produced.
enum LocalAttempt {
    Done(Reply),
    Retry(String),
}

/// Executes [`EndpointRequest`]s against the four endpoint classes.
pub struct EndpointClient<T> {
    credentials: Arc<CredentialManager<T>>,
    config: EndpointConfig,
    failure_log: LogThrottle,
    failure_hook: Option<FailureHook>,
}

impl<T: HttpTransport> EndpointClient<T> {
    pub fn new(credentials: Arc<CredentialManager<T>>, config: EndpointConfig) -> Self {
        let config = config.validated();
        Self {
            credentials,
            failure_log: LogThrottle::new(Duration::from_millis(config.failure_log_window_ms)),
            config,
            failure_hook: None,
        }
    }

    /// Registers a callback for exhausted local-service requests.
    ///
    /// The callback runs on a spawned task, so it never delays the caller.
    pub fn with_failure_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(LocalServiceFailure) + Send + Sync + 'static,
    {
        self.failure_hook = Some(Arc::new(hook));
        self
    }

    pub fn credentials(&self) -> &Arc<CredentialManager<T>> {
        &self.credentials
    }

    /// Executes one logical request.
    ///
    /// Returns `Ok(None)` only when the local service stayed unreachable
    /// for every attempt. A regional 404 comes back as a [`Reply`] whose
    /// [`is_not_found`](Reply::is_not_found) is true.
    pub async fn fetch(&self, request: EndpointRequest) -> Result<Option<Reply>, EndpointError> {
        match request.class {
            EndpointClass::Regional => self.fetch_regional(request).await.map(Some),
            EndpointClass::Party => self.fetch_party(request).await.map(Some),
            EndpointClass::LocalService => self.fetch_local(request).await,
            EndpointClass::Unrestricted => self.fetch_unrestricted(request).await.map(Some),
        }
    }

    /// Like [`fetch`](Self::fetch), deserializing the body.
    ///
    /// Not-found replies and an unreachable local service are `Ok(None)`.
    pub async fn fetch_json<D: DeserializeOwned>(
        &self,
        request: EndpointRequest,
    ) -> Result<Option<D>, EndpointError> {
        match self.fetch(request).await? {
            Some(reply) if !reply.is_not_found() => Ok(Some(serde_json::from_value(reply.body)?)),
            _ => Ok(None),
        }
    }

    /// Polls the local presence list.
    pub async fn presences(&self) -> Result<Option<PresenceList>, EndpointError> {
        self.fetch_json(EndpointRequest::local(PRESENCE_URI)).await
    }

    // -- Regional ---------------------------------------------------------

    async fn fetch_regional(&self, mut request: EndpointRequest) -> Result<Reply, EndpointError> {
        let mut stale = 0;
        let mut failed = 0;
        loop {
            request.attempt += 1;
            let bundle = self.bundle().await?;
            let region = bundle.region.as_ref().ok_or(EndpointError::RegionUnknown)?;
            let url = format!(
                "https://glz-{}-1.{}.a.pvp.net{}",
                region.region, region.shard, request.path
            );
            let reply = self.send_remote(&request, url, &bundle).await?;

            if reply.is_not_found() {
                return Ok(reply);
            }
            if self.is_stale(&reply) {
                stale += 1;
                self.credentials.invalidate();
                if self.config.regional_stale.exhausted(stale) {
                    tracing::warn!(path = %request.path, attempts = stale, "credentials still rejected");
                    return Err(EndpointError::Unauthorized);
                }
                tracing::debug!(path = %request.path, attempt = request.attempt, "stale credentials; retrying");
                tokio::time::sleep(self.config.regional_stale.delay()).await;
                continue;
            }
            if reply.is_ok() {
                return Ok(reply);
            }

            failed += 1;
            if self.config.regional_backoff.exhausted(failed) {
                return Err(exhausted(EndpointClass::Regional, &reply, request.attempt));
            }
            let wait = self
                .config
                .rate_limit_wait(reply.retry_after)
                .max(self.config.regional_backoff.delay());
            tracing::debug!(
                path = %request.path,
                status = reply.status,
                attempt = request.attempt,
                wait_secs = wait.as_secs(),
                "regional request failed; backing off"
            );
            tokio::time::sleep(wait).await;
            self.credentials.invalidate();
        }
    }

    // -- Party ------------------------------------------------------------

    async fn fetch_party(&self, mut request: EndpointRequest) -> Result<Reply, EndpointError> {
        let mut failed: u32 = 0;
        loop {
            request.attempt += 1;
            let bundle = self.bundle().await?;
            let region = bundle.region.as_ref().ok_or(EndpointError::RegionUnknown)?;
            let url = format!("https://pd.{}.a.pvp.net{}", region.shard, request.path);
            let reply = self.send_remote(&request, url, &bundle).await?;

            if reply.is_ok() || reply.is_not_found() {
                return Ok(reply);
            }

            failed += 1;
            if self.config.party.exhausted(failed) {
                return Err(exhausted(EndpointClass::Party, &reply, request.attempt));
            }
            if self.is_stale(&reply) || is_token_rejection(&reply) {
                tracing::debug!(path = %request.path, attempt = request.attempt, "stale credentials; retrying");
                self.credentials.invalidate();
                continue;
            }

            // Each retry waits longer than the last.
            let wait = self
                .config
                .rate_limit_wait(reply.retry_after)
                .saturating_mul(failed)
                .max(self.config.party.delay());
            tracing::debug!(
                path = %request.path,
                status = reply.status,
                attempt = request.attempt,
                wait_secs = wait.as_secs(),
                "party request failed; backing off"
            );
            tokio::time::sleep(wait).await;
            self.credentials.invalidate();
        }
    }

    // -- Local service ----------------------------------------------------

    async fn fetch_local(&self, mut request: EndpointRequest) -> Result<Option<Reply>, EndpointError> {
        let policy = self.config.local_service;
        loop {
            request.attempt += 1;
            match self.local_attempt(&request).await {
                LocalAttempt::Done(reply) => {
                    if !self.config.is_quiet(&request.path) {
                        tracing::trace!(path = %request.path, attempt = request.attempt, "local request succeeded");
                    }
                    return Ok(Some(reply));
                }
                LocalAttempt::Retry(reason) => {
                    tracing::debug!(path = %request.path, attempt = request.attempt, %reason, "local request failed");
                }
            }
            if policy.exhausted(request.attempt) {
                break;
            }
            tokio::time::sleep(policy.delay()).await;
        }

        self.report_local_failure(&request);
        Ok(None)
    }

    async fn local_attempt(&self, request: &EndpointRequest) -> LocalAttempt {
        let store = self.credentials.store();
        let descriptor = match store.read(true).await {
            Ok(Some(descriptor)) => descriptor,
            Ok(None) => return LocalAttempt::Retry("client not running".into()),
            Err(e) => return LocalAttempt::Retry(e.to_string()),
        };

        let mut http = HttpRequest::new(
            request.method,
            format!("https://127.0.0.1:{}{}", descriptor.port, request.path),
        )
        .header(
            "Authorization",
            basic_authorization(&self.credentials.config().user, &descriptor.password),
        )
        .timeout(Duration::from_millis(self.config.request_timeout_ms))
        .loopback();
        if let Some(body) = &request.body {
            http = http.json(body.clone());
        }

        let reply = match self.credentials.transport().send(http).await {
            Ok(response) => Reply::from(response),
            Err(e) => return LocalAttempt::Retry(e.to_string()),
        };
        if reply.error_code() == Some(self.config.busy_code.as_str()) {
            return LocalAttempt::Retry("service busy".into());
        }
        if !reply.is_ok() {
            return LocalAttempt::Retry(format!("status {}", reply.status));
        }
        LocalAttempt::Done(reply)
    }

    fn report_local_failure(&self, request: &EndpointRequest) {
        if self.failure_log.allow() {
            tracing::warn!(path = %request.path, attempts = request.attempt, "local service still failing");
        } else {
            tracing::debug!(path = %request.path, attempts = request.attempt, "local service still failing");
        }

        if let Some(hook) = &self.failure_hook {
            let hook = Arc::clone(hook);
            let failure = LocalServiceFailure {
                path: request.path.clone(),
                attempts: request.attempt,
            };
            tokio::spawn(async move { hook(failure) });
        }
    }

    // -- Unrestricted -----------------------------------------------------

    async fn fetch_unrestricted(&self, mut request: EndpointRequest) -> Result<Reply, EndpointError> {
        request.attempt += 1;
        let bundle = self.bundle().await?;
        let url = request.path.clone();
        let reply = self.send_remote(&request, url, &bundle).await?;
        if !reply.is_ok() {
            tracing::debug!(url = %request.path, status = reply.status, "custom request failed; clearing credentials");
            self.credentials.invalidate();
        }
        Ok(reply)
    }

    // -- Shared -----------------------------------------------------------

    async fn bundle(&self) -> Result<CredentialBundle, EndpointError> {
        let bundle = self.credentials.get_credentials(false, false).await;
        if bundle.is_empty() {
            return Err(EndpointError::Unauthorized);
        }
        Ok(bundle)
    }

    async fn send_remote(
        &self,
        request: &EndpointRequest,
        url: String,
        bundle: &CredentialBundle,
    ) -> Result<Reply, EndpointError> {
        let mut http = HttpRequest::new(request.method, url)
            .header("Authorization", format!("Bearer {}", bundle.bearer_token))
            .header("X-Riot-Entitlements-JWT", &bundle.entitlement_jwt)
            .header("X-Riot-ClientPlatform", &bundle.platform_header)
            .header("X-Riot-ClientVersion", &bundle.client_version)
            .header("User-Agent", USER_AGENT)
            .timeout(Duration::from_millis(self.config.request_timeout_ms));
        if let Some(body) = &request.body {
            http = http.json(body.clone());
        }

        match self.credentials.transport().send(http).await {
            Ok(response) => Ok(Reply::from(response)),
            Err(e) => {
                tracing::warn!(class = %request.class, path = %request.path, error = %e, "request failed");
                Err(e.into())
            }
        }
    }

    fn is_stale(&self, reply: &Reply) -> bool {
        reply.error_code() == Some(self.config.stale_credential_code.as_str())
    }
}

/// A 400 whose message blames the token.
fn is_token_rejection(reply: &Reply) -> bool {
    reply.status == 400
        && reply
            .message()
            .is_some_and(|m| m.to_ascii_lowercase().contains("token"))
}

fn exhausted(class: EndpointClass, reply: &Reply, attempts: u32) -> EndpointError {
    tracing::warn!(%class, status = reply.status, attempts, "retry ceiling reached");
    if reply.status == 429 {
        EndpointError::RateLimited {
            retry_after: reply.retry_after.unwrap_or_default(),
        }
    } else {
        EndpointError::ExhaustedRetries { class, attempts }
    }
}
