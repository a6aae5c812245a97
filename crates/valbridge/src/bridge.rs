//! `Bridge` builder and facade.
//!
//! This is the entry point for hosts. It ties the layers together:
//! descriptor store → credentials → endpoint client / state watcher.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use valbridge_endpoint::{EndpointClient, EndpointConfig, EndpointRequest, LocalServiceFailure, Reply};
use valbridge_protocol::{DecodedPresence, PresenceCodec, SessionState};
use valbridge_session::{CredentialConfig, CredentialManager, DescriptorStore};
use valbridge_transport::{HttpTransport, ReqwestTransport, StreamConnector, WebSocketConnector};
use valbridge_watch::{SessionStateWatcher, WatchConfig, WatchOutcome};

use crate::BridgeError;

type FailureHook = Arc<dyn Fn(LocalServiceFailure) + Send + Sync>;

/// Builder for a [`Bridge`].
///
/// # Example
///
/// ```rust,ignore
/// use valbridge::prelude::*;
///
/// let bridge = Bridge::builder()
///     .on_local_failure(|failure| eprintln!("client unreachable: {}", failure.path))
///     .build()?;
/// bridge.start();
/// let outcome = bridge.await_state_change(&SessionState::Menus).await;
/// ```
#[derive(Default)]
pub struct BridgeBuilder {
    descriptor_path: Option<PathBuf>,
    credentials: CredentialConfig,
    endpoints: EndpointConfig,
    watch: WatchConfig,
    failure_hook: Option<FailureHook>,
}

impl BridgeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the descriptor from `path` instead of the platform default.
    pub fn descriptor_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.descriptor_path = Some(path.into());
        self
    }

    pub fn credential_config(mut self, config: CredentialConfig) -> Self {
        self.credentials = config;
        self
    }

    pub fn endpoint_config(mut self, config: EndpointConfig) -> Self {
        self.endpoints = config;
        self
    }

    pub fn watch_config(mut self, config: WatchConfig) -> Self {
        self.watch = config;
        self
    }

    /// Called (on a spawned task) when a local-service request exhausts
    /// its attempts.
    pub fn on_local_failure<F>(mut self, hook: F) -> Self
    where
        F: Fn(LocalServiceFailure) + Send + Sync + 'static,
    {
        self.failure_hook = Some(Arc::new(hook));
        self
    }

    /// Builds a bridge over reqwest and tokio-tungstenite.
    pub fn build(self) -> Result<Bridge<ReqwestTransport, WebSocketConnector>, BridgeError> {
        let transport = ReqwestTransport::new()?;
        self.build_with(transport, WebSocketConnector::new())
    }

    /// Builds a bridge over caller-supplied transports.
    ///
    /// Performs no I/O: nothing is read or requested until the bridge is
    /// used or [`Bridge::start`] is called.
    pub fn build_with<T, C>(self, transport: T, connector: C) -> Result<Bridge<T, C>, BridgeError>
    where
        T: HttpTransport,
        C: StreamConnector,
    {
        let path = self
            .descriptor_path
            .or_else(DescriptorStore::default_location)
            .ok_or_else(|| BridgeError::Config("no local data directory for the descriptor".into()))?;
        let store = Arc::new(DescriptorStore::new(path));
        let credentials = Arc::new(CredentialManager::new(
            Arc::clone(&store),
            transport,
            self.credentials,
        ));

        let mut endpoints = EndpointClient::new(Arc::clone(&credentials), self.endpoints);
        if let Some(hook) = self.failure_hook {
            endpoints = endpoints.with_failure_hook(move |failure| hook(failure));
        }

        let skip_product = self.watch.skip_product.clone();
        let watcher = SessionStateWatcher::new(connector, Arc::clone(&credentials), self.watch);

        Ok(Bridge {
            store,
            credentials,
            endpoints,
            watcher,
            skip_product,
            startup: Mutex::new(None),
        })
    }
}

/// One connection to the local game client.
///
/// Owns the descriptor store, credential manager, endpoint client, and
/// state watcher.
pub struct Bridge<T, C> {
    store: Arc<DescriptorStore>,
    credentials: Arc<CredentialManager<T>>,
    endpoints: EndpointClient<T>,
    watcher: SessionStateWatcher<C, T>,
    skip_product: String,
    startup: Mutex<Option<JoinHandle<()>>>,
}

impl Bridge<ReqwestTransport, WebSocketConnector> {
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }
}

impl<T, C> Bridge<T, C>
where
    T: HttpTransport,
    C: StreamConnector,
{
    /// Starts fast-mode credential acquisition on a detached task and
    /// returns immediately.
    ///
    /// Must be called from within a Tokio runtime. Calling it again while
    /// the first acquisition is still running does nothing.
    pub fn start(&self) {
        let mut startup = self.startup.lock().unwrap_or_else(PoisonError::into_inner);
        if startup.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        let credentials = Arc::clone(&self.credentials);
        *startup = Some(tokio::spawn(async move {
            let bundle = credentials.get_credentials(false, true).await;
            if bundle.is_empty() {
                tracing::info!("game client not ready at startup");
            }
        }));
    }

    /// See [`EndpointClient::fetch`].
    pub async fn fetch(&self, request: EndpointRequest) -> Result<Option<Reply>, BridgeError> {
        Ok(self.endpoints.fetch(request).await?)
    }

    /// See [`EndpointClient::fetch_json`].
    pub async fn fetch_json<D: DeserializeOwned>(
        &self,
        request: EndpointRequest,
    ) -> Result<Option<D>, BridgeError> {
        Ok(self.endpoints.fetch_json(request).await?)
    }

    /// See [`SessionStateWatcher::await_state_change`].
    pub async fn await_state_change(&self, baseline: &SessionState) -> WatchOutcome {
        self.watcher.await_state_change(baseline).await
    }

    /// Polls the local presence list and decodes own presence.
    ///
    /// `Ok(None)` when the client is unreachable, credentials are
    /// unavailable, or own presence carries no private blob.
    pub async fn self_presence(&self) -> Result<Option<DecodedPresence>, BridgeError> {
        let subject = self.credentials.get_credentials(false, false).await.subject_id;
        if subject.is_empty() {
            return Ok(None);
        }
        let Some(presences) = self.endpoints.presences().await? else {
            return Ok(None);
        };
        Ok(presences
            .find_subject(&subject, &self.skip_product)
            .and_then(|record| record.raw_private_blob.as_deref())
            .map(|blob| PresenceCodec.decode(blob)))
    }

    /// Cancels the watcher and the startup task. Terminal: later watches
    /// resolve to [`WatchOutcome::Disconnected`] at once.
    pub fn shutdown(&self) {
        self.watcher.shutdown();
        if let Some(task) = self
            .startup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        tracing::info!("bridge shut down");
    }

    pub fn store(&self) -> &Arc<DescriptorStore> {
        &self.store
    }

    pub fn credentials(&self) -> &Arc<CredentialManager<T>> {
        &self.credentials
    }

    pub fn endpoints(&self) -> &EndpointClient<T> {
        &self.endpoints
    }

    pub fn watcher(&self) -> &SessionStateWatcher<C, T> {
        &self.watcher
    }
}

impl<T, C> Drop for Bridge<T, C> {
    fn drop(&mut self) {
        if let Some(task) = self
            .startup
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}
