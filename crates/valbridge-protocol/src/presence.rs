//! Presence records and the session states decoded from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The phase the local game client is in.
///
/// On the wire this is an upper-case string (`"MENUS"`, `"PREGAME"`,
/// `"INGAME"`). States this crate doesn't know yet are kept verbatim in
/// [`SessionState::Other`] so a client update never turns into a decode
/// failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Main menu or lobby.
    Menus,
    /// Agent select.
    Pregame,
    /// A match is running.
    InGame,
    /// Any state string not listed above.
    Other(String),
}

impl SessionState {
    /// The wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Menus => "MENUS",
            Self::Pregame => "PREGAME",
            Self::InGame => "INGAME",
            Self::Other(s) => s,
        }
    }
}

impl FromStr for SessionState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "MENUS" => Self::Menus,
            "PREGAME" => Self::Pregame,
            "INGAME" => Self::InGame,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<&str> for SessionState {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(state) => state,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SessionState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SessionState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

// ---------------------------------------------------------------------------
// PresenceRecord
// ---------------------------------------------------------------------------

/// One entry of the local chat service's presence list.
///
/// Only the fields the bridge reads are modelled; everything else the
/// service sends is ignored by serde.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    /// The subject (player) this presence belongs to.
    #[serde(rename = "puuid")]
    pub subject_id: String,

    /// Which product published the presence. Other games share the same
    /// presence list, so callers filter on this.
    #[serde(rename = "product", default)]
    pub product_tag: String,

    /// Base64-encoded JSON describing party and match state.
    #[serde(rename = "private", default, skip_serializing_if = "Option::is_none")]
    pub raw_private_blob: Option<String>,
}

impl PresenceRecord {
    /// `true` when the record carries a non-blank private blob.
    pub fn is_private_data_present(&self) -> bool {
        self.raw_private_blob
            .as_deref()
            .is_some_and(|blob| !blob.trim().is_empty())
    }
}

/// The `{ "presences": [...] }` body shared by the local presence endpoint
/// and the presence event topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceList {
    #[serde(default)]
    pub presences: Vec<PresenceRecord>,
}

impl PresenceList {
    /// Finds the record for `subject_id`, skipping any record published by
    /// `skip_product`.
    pub fn find_subject(
        &self,
        subject_id: &str,
        skip_product: &str,
    ) -> Option<&PresenceRecord> {
        self.presences
            .iter()
            .filter(|p| p.product_tag != skip_product)
            .find(|p| p.subject_id == subject_id)
    }
}

// ---------------------------------------------------------------------------
// DecodedPresence
// ---------------------------------------------------------------------------

/// The result of decoding a presence's private blob.
///
/// Decoding never fails: anything that can't be decoded becomes the
/// [`invalid`](Self::invalid) sentinel. When the payload decodes but
/// carries `isValid: false`, `is_valid` is `false` and the other fields are
/// still populated so they can be logged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedPresence {
    pub session_state: Option<SessionState>,
    pub party_id: Option<String>,
    pub party_size: u32,
    pub queue_id: Option<String>,
    pub is_valid: bool,
}

impl DecodedPresence {
    /// The sentinel returned for empty or undecodable blobs.
    pub fn invalid() -> Self {
        Self::default()
    }
}
