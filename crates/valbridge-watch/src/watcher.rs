//! The session state watcher.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use valbridge_protocol::{EventFrame, PresenceCodec, SessionDescriptor, SessionState, Topic};
use valbridge_session::{CredentialManager, basic_authorization};
use valbridge_transport::{EventStream, HttpTransport, StreamConnector, StreamTarget, TransportError};

use crate::{Backoff, WatchConfig, WatchOutcome};

/// Watches the local event stream for session state changes.
///
/// Holds at most one open connection: concurrent
/// [`await_state_change`](Self::await_state_change) calls on the same
/// watcher queue up behind each other.
pub struct SessionStateWatcher<C, T> {
    connector: C,
    credentials: Arc<CredentialManager<T>>,
    config: WatchConfig,
    codec: PresenceCodec,
    connection: tokio::sync::Mutex<()>,
    shutdown: CancellationToken,
}

impl<C: StreamConnector, T: HttpTransport> SessionStateWatcher<C, T> {
    pub fn new(connector: C, credentials: Arc<CredentialManager<T>>, config: WatchConfig) -> Self {
        Self {
            connector,
            credentials,
            config: config.validated(),
            codec: PresenceCodec,
            connection: tokio::sync::Mutex::new(()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Waits until own presence reports a state other than `baseline`.
    ///
    /// Resolves to [`WatchOutcome::Disconnected`] when no client is
    /// running, when every connection attempt failed, or when the watcher
    /// is shut down. Dropping the returned future closes any open
    /// connection and cancels pending backoff timers.
    pub async fn await_state_change(&self, baseline: &SessionState) -> WatchOutcome {
        let _connection = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return WatchOutcome::Disconnected,
            guard = self.connection.lock() => guard,
        };

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                tracing::info!("state watch cancelled");
                WatchOutcome::Disconnected
            }
            outcome = self.watch(baseline) => {
                tracing::info!(%baseline, %outcome, "state watch resolved");
                outcome
            }
        }
    }

    /// Cancels the in-flight watch, if any, and every future one.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// A token cancelled by [`shutdown`](Self::shutdown).
    pub fn cancel_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    async fn watch(&self, baseline: &SessionState) -> WatchOutcome {
        let mut backoff = Backoff::new(self.config.initial_backoff());
        let attempts = self.config.max_attempts;

        for attempt in 1..=attempts {
            let descriptor = match self.credentials.store().read(true).await {
                Ok(Some(descriptor)) => descriptor,
                _ => {
                    tracing::debug!(attempt, "no session descriptor; client not running");
                    return WatchOutcome::Disconnected;
                }
            };

            match self.session(&descriptor, baseline).await {
                Ok(state) => return WatchOutcome::Changed(state),
                Err(e) => {
                    tracing::debug!(attempt, attempts, error = %e, "event stream interrupted");
                }
            }

            if attempt < attempts {
                tokio::time::sleep(backoff.next_delay()).await;
            }
        }

        tracing::warn!(attempts, "event stream unavailable; giving up");
        WatchOutcome::Disconnected
    }

    /// One connection: connect, subscribe, read until the state changes.
    async fn session(
        &self,
        descriptor: &SessionDescriptor,
        baseline: &SessionState,
    ) -> Result<SessionState, TransportError> {
        let subject = self.credentials.get_credentials(false, true).await.subject_id;
        if subject.is_empty() {
            return Err(TransportError::Connect("own subject unknown".into()));
        }

        let target = StreamTarget {
            url: format!("{}://127.0.0.1:{}", self.config.scheme(), descriptor.port),
            authorization: Some(basic_authorization(
                &self.credentials.config().user,
                &descriptor.password,
            )),
            accept_invalid_certs: self.config.use_tls,
        };
        let mut stream = self.connector.connect(&target).await?;
        let id = stream.id();
        tracing::debug!(%id, port = descriptor.port, "event stream opened");

        for topic in Topic::ALL {
            stream.send_text(&topic.subscribe_directive()).await?;
        }

        loop {
            let Some(text) = stream.recv_text().await? else {
                return Err(TransportError::ConnectionClosed(format!("{id} closed by peer")));
            };
            if let Some(state) = self.inspect(&text, &subject, baseline) {
                if let Err(e) = stream.close().await {
                    tracing::debug!(%id, error = %e, "close failed");
                }
                return Ok(state);
            }
        }
    }

    /// Returns the new state if `text` is a presence frame for `subject`
    /// whose state differs from `baseline`.
    fn inspect(&self, text: &str, subject: &str, baseline: &SessionState) -> Option<SessionState> {
        if text.len() < self.config.min_frame_len {
            return None;
        }
        let frame = match EventFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::trace!(error = %e, "ignoring unparseable frame");
                return None;
            }
        };
        if !frame.is_presence() {
            return None;
        }

        let presences = frame.presences().ok()?;
        let record = presences.find_subject(subject, &self.config.skip_product)?;
        let blob = record.raw_private_blob.as_deref()?;
        let state = self.codec.decode(blob).session_state?;

        if &state == baseline {
            tracing::trace!(%state, "presence unchanged");
            None
        } else {
            Some(state)
        }
    }
}
