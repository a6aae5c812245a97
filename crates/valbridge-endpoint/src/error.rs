//! Error types for the endpoint layer.

use valbridge_transport::TransportError;

use crate::EndpointClass;

/// Errors surfaced by [`EndpointClient`](crate::EndpointClient).
///
/// "Not found" is not an error: it is either `Ok(None)` or a
/// [`Reply`](crate::Reply) whose status is 404.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// No response was received.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// No credentials could be obtained, or they kept being rejected.
    #[error("credentials unavailable or rejected")]
    Unauthorized,

    /// Still rate limited when the retry ceiling was reached.
    #[error("rate limited (retry after {retry_after}s)")]
    RateLimited { retry_after: u64 },

    /// A bounded branch ran out of attempts.
    #[error("{class} request failed after {attempts} attempts")]
    ExhaustedRetries { class: EndpointClass, attempts: u32 },

    /// The region/shard for remote hosts is not known.
    #[error("region unknown; cannot build remote URL")]
    RegionUnknown,

    /// The reply body did not match the requested type.
    #[error("failed to decode reply: {0}")]
    Decode(#[from] serde_json::Error),
}
