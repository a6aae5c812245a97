/// Errors that can occur in the transport layer.
///
/// Messages are carried as strings so the error is `Clone`: the retry
/// loops above log an error and keep a copy for the final report, and the
/// scripted fakes replay the same failure more than once.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The peer could not be reached (refused, reset, DNS).
    #[error("connect failed: {0}")]
    Connect(String),

    /// The request or handshake did not finish in time.
    #[error("timed out")]
    Timeout,

    /// The request could not be built or sent.
    #[error("request failed: {0}")]
    Request(String),

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// A TLS connector could not be built.
    #[error("tls setup failed: {0}")]
    Tls(String),
}
