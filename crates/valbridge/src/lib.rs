//! # valbridge
//!
//! Background bridge to a locally running game client.
//!
//! valbridge discovers the client's session descriptor, exchanges it for
//! short-lived credentials, issues requests against four endpoint classes
//! with class-specific retry policies, and watches the client's event
//! stream for session state changes. Expected trouble (client not running,
//! token not ready, rate limits, dropped streams) is absorbed and retried;
//! nothing here blocks the host's startup.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use valbridge::prelude::*;
//!
//! # async fn run() -> Result<(), BridgeError> {
//! let bridge = Bridge::builder().build()?;
//! bridge.start();
//!
//! let outcome = bridge.await_state_change(&SessionState::Menus).await;
//! println!("session is now {outcome}");
//! # Ok(())
//! # }
//! ```

mod bridge;
mod error;
pub mod logging;
pub mod reference;

pub use bridge::{Bridge, BridgeBuilder};
pub use error::BridgeError;

pub use valbridge_endpoint as endpoint;
pub use valbridge_protocol as protocol;
pub use valbridge_session as session;
pub use valbridge_transport as transport;
pub use valbridge_watch as watch;

/// The types most hosts need.
pub mod prelude {
    pub use crate::reference::{ReferenceCache, ReferenceCatalog, ReferenceSource};
    pub use crate::{Bridge, BridgeBuilder, BridgeError};
    pub use valbridge_endpoint::{
        EndpointClass, EndpointConfig, EndpointError, EndpointRequest, LocalServiceFailure, Reply,
        RetryPolicy,
    };
    pub use valbridge_protocol::{DecodedPresence, PresenceCodec, SessionDescriptor, SessionState};
    pub use valbridge_session::{CredentialBundle, CredentialConfig, Region};
    pub use valbridge_watch::{WatchConfig, WatchOutcome};
}
