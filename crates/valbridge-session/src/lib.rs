//! Local session discovery and credential management for valbridge.
//!
//! This crate turns "a game client might be running" into credentials the
//! endpoint layer can use:
//!
//! 1. **Discovery** ([`DescriptorStore`]) reads the descriptor file the
//!    client writes on launch and notices when it restarts on a new port.
//! 2. **Credentials** ([`CredentialManager`]) exchanges the descriptor for
//!    a [`CredentialBundle`], caching it until someone invalidates it.
//!
//! # How it fits in the stack
//!
//! ```text
//! Endpoint / Watch (above)  ← ask for credentials, invalidate when rejected
//!     ↕
//! Session Layer (this crate)  ← descriptor file, token exchange, client log
//!     ↕
//! Protocol + Transport (below)  ← descriptor parsing, HTTP requests
//! ```

mod auth;
mod bundle;
mod client_log;
mod credentials;
mod descriptor_store;
mod error;

pub use auth::basic_authorization;
pub use bundle::{CredentialBundle, PLATFORM_HEADER, Region};
pub use client_log::{ClientLogInfo, scan as scan_client_log};
pub use credentials::{CredentialConfig, CredentialManager, TOKEN_PATH};
pub use descriptor_store::DescriptorStore;
pub use error::SessionError;
