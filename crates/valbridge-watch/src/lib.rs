//! Push-based session state watching for valbridge.
//!
//! [`SessionStateWatcher::await_state_change`] opens the local event
//! stream, subscribes to presence updates, and resolves as soon as the
//! player's own presence decodes to a session state different from the
//! caller's baseline.
//!
//! # Reconnects
//!
//! A dropped or refused connection is retried with doubling backoff:
//!
//! ```text
//! attempt 1 ─2s─ attempt 2 ─4s─ attempt 3 ─8s─ attempt 4 ─16s─ attempt 5 → Disconnected
//! ```
//!
//! The watcher never errors. Every failure ends in
//! [`WatchOutcome::Disconnected`].
//!
//! # Integration
//!
//! ```ignore
//! let mut state = SessionState::Menus;
//! loop {
//!     match watcher.await_state_change(&state).await {
//!         WatchOutcome::Changed(next) => state = next,
//!         WatchOutcome::Disconnected => break,
//!     }
//! }
//! ```

mod backoff;
mod watcher;

pub use backoff::Backoff;
pub use watcher::SessionStateWatcher;

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use valbridge_protocol::SessionState;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the state watcher.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Connection attempts per `await_state_change` call.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each further one.
    pub initial_backoff_ms: u64,
    /// Frames shorter than this are keep-alives and ignored.
    pub min_frame_len: usize,
    /// Presence records from this product are not ours.
    pub skip_product: String,
    /// `wss` with certificate checks off (the local client's certificate is
    /// self-signed), or plain `ws`.
    pub use_tls: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 2_000,
            min_frame_len: 10,
            skip_product: "league_of_legends".into(),
            use_tls: true,
        }
    }
}

impl WatchConfig {
    /// Clamps to at least one attempt.
    pub fn validated(mut self) -> Self {
        self.max_attempts = self.max_attempts.max(1);
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    fn scheme(&self) -> &'static str {
        if self.use_tls { "wss" } else { "ws" }
    }
}

// ---------------------------------------------------------------------------
// WatchOutcome
// ---------------------------------------------------------------------------

/// How an `await_state_change` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Own presence decoded to a state different from the baseline.
    Changed(SessionState),
    /// No client, connection attempts exhausted, or the watcher was shut
    /// down.
    Disconnected,
}

impl WatchOutcome {
    pub fn state(&self) -> Option<&SessionState> {
        match self {
            Self::Changed(state) => Some(state),
            Self::Disconnected => None,
        }
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }
}

impl fmt::Display for WatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Changed(state) => write!(f, "{state}"),
            Self::Disconnected => f.write_str("DISCONNECTED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        assert_eq!(WatchOutcome::Changed(SessionState::InGame).to_string(), "INGAME");
        assert_eq!(WatchOutcome::Disconnected.to_string(), "DISCONNECTED");
    }

    #[test]
    fn test_config_defaults() {
        let config = WatchConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.initial_backoff(), Duration::from_secs(2));
        assert_eq!(config.scheme(), "wss");
        assert_eq!(config.with_tls(false).scheme(), "ws");
    }

    #[test]
    fn test_validated_clamps_attempts() {
        assert_eq!(WatchConfig::default().with_max_attempts(0).validated().max_attempts, 1);
    }
}
