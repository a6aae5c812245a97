//! Frames exchanged on the local event stream.
//!
//! The local service speaks a small WAMP-style dialect over WebSocket.
//! Subscribing is a two-element array with opcode `5`; events arrive as
//! three-element arrays with opcode `8`:
//!
//! ```text
//! → [5, "OnJsonApiEvent_chat_v4_presences"]
//! ← [8, "OnJsonApiEvent_chat_v4_presences",
//!      { "uri": "/chat/v4/presences", "eventType": "Update", "data": { ... } }]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{PresenceList, ProtocolError};

/// Opcode for a subscription request.
pub const OPCODE_SUBSCRIBE: u8 = 5;
/// Opcode for an inbound event.
pub const OPCODE_EVENT: u8 = 8;

/// URI carried by presence events.
pub const PRESENCE_URI: &str = "/chat/v4/presences";

/// Event topics the watcher subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Presences,
    ChatMessages,
    PregameMatch,
}

impl Topic {
    /// Every topic, in subscription order.
    pub const ALL: [Topic; 3] = [Topic::Presences, Topic::ChatMessages, Topic::PregameMatch];

    /// The event name used on the wire.
    pub fn event_name(self) -> &'static str {
        match self {
            Self::Presences => "OnJsonApiEvent_chat_v4_presences",
            Self::ChatMessages => "OnJsonApiEvent_chat_v5_messages",
            Self::PregameMatch => "OnJsonApiEvent_riot-messaging-service_v1_message",
        }
    }

    /// The text frame that subscribes to this topic.
    pub fn subscribe_directive(self) -> String {
        format!("[{OPCODE_SUBSCRIBE}, \"{}\"]", self.event_name())
    }
}

/// The third element of an event frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub uri: String,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// A parsed inbound event frame.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFrame {
    pub opcode: u8,
    pub event: String,
    pub payload: EventPayload,
}

impl EventFrame {
    /// Parses a text frame.
    ///
    /// Fails on anything that isn't a `[opcode, event, {uri, data}]` array.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let (opcode, event, payload): (u8, String, EventPayload) = serde_json::from_str(text)?;
        if opcode != OPCODE_EVENT {
            return Err(ProtocolError::InvalidMessage(format!(
                "unexpected opcode {opcode}"
            )));
        }
        Ok(Self {
            opcode,
            event,
            payload,
        })
    }

    /// Returns `true` if this frame carries presence updates.
    pub fn is_presence(&self) -> bool {
        self.payload.uri == PRESENCE_URI
    }

    /// Deserializes the presence list from a presence frame.
    pub fn presences(&self) -> Result<PresenceList, ProtocolError> {
        if !self.is_presence() {
            return Err(ProtocolError::InvalidMessage(format!(
                "{} is not a presence event",
                self.payload.uri
            )));
        }
        Ok(PresenceList::deserialize(&self.payload.data)?)
    }
}
