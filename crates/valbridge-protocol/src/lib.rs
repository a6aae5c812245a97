//! Local client data formats for valbridge.
//!
//! This crate knows how to read what the running game client publishes,
//! and nothing about how to fetch it:
//!
//! - **Descriptor** ([`SessionDescriptor`]) — the colon-delimited record
//!   that says which port and password the local service uses.
//! - **Presence** ([`PresenceRecord`], [`DecodedPresence`], [`SessionState`])
//!   and the [`PresenceCodec`] that turns a base64 private blob into a
//!   session state.
//! - **Event frames** ([`EventFrame`], [`Topic`]) — the subscription
//!   directives and inbound frames of the local event stream.
//!
//! ```text
//! Transport (bytes) → Protocol (descriptor, presence, frames) → Session / Watch
//! ```

mod codec;
mod descriptor;
mod error;
mod event;
mod presence;

pub use codec::{
    MatchPresenceData, PartyPresenceData, PayloadShape, PresenceCodec, PresencePayload,
    extract_session_state,
};
pub use descriptor::SessionDescriptor;
pub use error::ProtocolError;
pub use event::{EventFrame, EventPayload, OPCODE_EVENT, OPCODE_SUBSCRIBE, PRESENCE_URI, Topic};
pub use presence::{DecodedPresence, PresenceList, PresenceRecord, SessionState};
