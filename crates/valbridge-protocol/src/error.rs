//! Error types for the protocol layer.
//!
//! Each crate in valbridge defines its own error enum. A `ProtocolError`
//! always means "these bytes did not look like what the game client
//! sends", never a network or credential problem.
//!
//! Most callers never see these: [`PresenceCodec`](crate::PresenceCodec)
//! folds every failure into an invalid [`DecodedPresence`](crate::DecodedPresence)
//! sentinel. The error type exists for the strict entry points
//! (`str::parse::<SessionDescriptor>()`, [`EventFrame::parse`](crate::EventFrame::parse))
//! where the caller wants to know *why* a record was rejected.

/// Errors that can occur while parsing local client data.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The session descriptor record was malformed: wrong field count,
    /// an empty field, or a non-numeric process id / port.
    #[error("malformed session descriptor: {0}")]
    Descriptor(String),

    /// JSON deserialization failed.
    #[error("decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// The presence blob was not valid base64.
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The message parsed but violates the expected frame shape.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
