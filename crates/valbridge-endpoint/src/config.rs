//! Endpoint client configuration.

use std::time::Duration;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// How many times a branch may run and how long to wait between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempt ceiling. 0 means unbounded.
    pub max_attempts: u32,
    /// Fixed wait between attempts. Rate-limited branches wait at least
    /// this long and otherwise follow `Retry-After`.
    pub delay_ms: u64,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            delay_ms,
        }
    }

    /// `true` once `attempts` runs have used up the ceiling.
    pub fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts != 0 && attempts >= self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

// ---------------------------------------------------------------------------
// EndpointConfig
// ---------------------------------------------------------------------------

/// Per-class retry policies and the wire codes that drive them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Regional class, stale-credential branch.
    pub regional_stale: RetryPolicy,
    /// Regional class, rate-limit and other non-success branch.
    pub regional_backoff: RetryPolicy,
    /// Party class, every retrying branch.
    pub party: RetryPolicy,
    pub local_service: RetryPolicy,
    pub unrestricted: RetryPolicy,
    /// `errorCode` that marks a rejected credential bundle.
    pub stale_credential_code: String,
    /// `errorCode` the local service returns while busy.
    pub busy_code: String,
    /// Added to `Retry-After` before waiting.
    pub rate_limit_padding_secs: u64,
    /// Assumed `Retry-After` when the header is missing.
    pub default_retry_after_secs: u64,
    /// Local paths polled so often their success lines are not logged.
    pub quiet_paths: Vec<String>,
    /// Minimum gap between "local service still failing" warnings.
    pub failure_log_window_ms: u64,
    /// Per-request timeout for remote classes.
    pub request_timeout_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            regional_stale: RetryPolicy::new(3, 1_000),
            regional_backoff: RetryPolicy::new(10, 0),
            party: RetryPolicy::new(10, 0),
            local_service: RetryPolicy::new(5, 1_000),
            unrestricted: RetryPolicy::new(1, 0),
            stale_credential_code: "BAD_CLAIMS".into(),
            busy_code: "RPC_ERROR".into(),
            rate_limit_padding_secs: 5,
            default_retry_after_secs: 10,
            quiet_paths: vec![valbridge_protocol::PRESENCE_URI.into()],
            failure_log_window_ms: 30_000,
            request_timeout_ms: 10_000,
        }
    }
}

impl EndpointConfig {
    /// Ensures the bounded classes make at least one attempt. The regional
    /// backoff and party ceilings may stay 0 (unbounded).
    pub fn validated(mut self) -> Self {
        self.regional_stale.max_attempts = self.regional_stale.max_attempts.max(1);
        self.local_service.max_attempts = self.local_service.max_attempts.max(1);
        self.unrestricted.max_attempts = self.unrestricted.max_attempts.max(1);
        self
    }

    pub fn with_local_service(mut self, policy: RetryPolicy) -> Self {
        self.local_service = policy;
        self
    }

    pub fn with_regional_backoff(mut self, policy: RetryPolicy) -> Self {
        self.regional_backoff = policy;
        self
    }

    pub fn with_party(mut self, policy: RetryPolicy) -> Self {
        self.party = policy;
        self
    }

    pub fn with_quiet_paths(mut self, paths: Vec<String>) -> Self {
        self.quiet_paths = paths;
        self
    }

    pub(crate) fn is_quiet(&self, path: &str) -> bool {
        self.quiet_paths.iter().any(|quiet| quiet == path)
    }

    /// Wait before retrying a rate-limited (or otherwise failed) request.
    pub(crate) fn rate_limit_wait(&self, retry_after: Option<u64>) -> Duration {
        let secs = retry_after.unwrap_or(self.default_retry_after_secs);
        Duration::from_secs(secs.saturating_add(self.rate_limit_padding_secs))
    }
}
