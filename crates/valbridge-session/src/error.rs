//! Error types for the session layer.

use std::path::PathBuf;

/// Errors surfaced by the descriptor store.
///
/// Credential acquisition has no error type of its own: every failure there
/// is absorbed into an empty [`CredentialBundle`](crate::CredentialBundle).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The descriptor file is missing or malformed, meaning the local
    /// client is not running (or is mid-restart).
    #[error("session descriptor unavailable at {}", .0.display())]
    DescriptorUnavailable(PathBuf),

    /// The descriptor file exists but could not be read.
    #[error("failed to read session descriptor: {0}")]
    Io(#[from] std::io::Error),
}
