//! Unified error type for valbridge.

use valbridge_endpoint::EndpointError;
use valbridge_protocol::ProtocolError;
use valbridge_session::SessionError;
use valbridge_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// The bridge could not be assembled (e.g. no descriptor location).
    #[error("invalid bridge configuration: {0}")]
    Config(String),
}
