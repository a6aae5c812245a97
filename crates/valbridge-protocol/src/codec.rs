//! Presence codec: base64 private blob ⇄ [`DecodedPresence`].
//!
//! The private field of a presence record is base64-encoded JSON. The
//! game client has shipped two layouts for that JSON over time:
//!
//! ```text
//! nested: { "isValid": true,
//!           "matchPresenceData": { "sessionLoopState": "INGAME", "queueId": "competitive" },
//!           "partyPresenceData": { "partyId": "...", "partySize": 2 } }
//!
//! flat:   { "isValid": true, "sessionLoopState": "INGAME", "queueId": "competitive",
//!           "partyId": "...", "partySize": 2 }
//! ```
//!
//! Both the polling path (local presence endpoint) and the streaming path
//! (presence event topic) decode through [`PresenceCodec`], so both agree
//! on what a blob means.
//!
//! Decoding is total: empty input, input with a stray `{`, bad base64, and
//! bad JSON all return [`DecodedPresence::invalid`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::{DecodedPresence, ProtocolError, SessionState};

// ---------------------------------------------------------------------------
// Payload schema
// ---------------------------------------------------------------------------

/// Match block of the nested layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPresenceData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_loop_state: Option<SessionState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<String>,
}

/// Party block of the nested layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyPresenceData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_size: Option<u32>,
}

/// The decoded JSON inside a private blob.
///
/// One struct covers both layouts: the nested blocks and the flat fields
/// are all optional, and the accessors below decide which one applies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_valid: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_presence_data: Option<MatchPresenceData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_presence_data: Option<PartyPresenceData>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_loop_state: Option<SessionState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_size: Option<u32>,
}

/// Where a session state was found in a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// `matchPresenceData.sessionLoopState`
    Nested,
    /// top-level `sessionLoopState`
    Flat,
}

impl PresencePayload {
    /// Locates the session state, checking the nested layout first.
    pub fn session_state(&self) -> Option<(PayloadShape, &SessionState)> {
        if let Some(state) = self
            .match_presence_data
            .as_ref()
            .and_then(|m| m.session_loop_state.as_ref())
        {
            return Some((PayloadShape::Nested, state));
        }
        self.session_loop_state
            .as_ref()
            .map(|state| (PayloadShape::Flat, state))
    }

    fn party_id(&self) -> Option<&String> {
        self.party_presence_data
            .as_ref()
            .and_then(|p| p.party_id.as_ref())
            .or(self.party_id.as_ref())
    }

    fn party_size(&self) -> Option<u32> {
        self.party_presence_data
            .as_ref()
            .and_then(|p| p.party_size)
            .or(self.party_size)
    }

    fn queue_id(&self) -> Option<&String> {
        self.match_presence_data
            .as_ref()
            .and_then(|m| m.queue_id.as_ref())
            .or(self.queue_id.as_ref())
    }
}

// ---------------------------------------------------------------------------
// PresenceCodec
// ---------------------------------------------------------------------------

/// Stateless encoder/decoder for presence private blobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresenceCodec;

impl PresenceCodec {
    /// Decodes a base64 private blob.
    ///
    /// Never fails; see the module docs for what yields the invalid
    /// sentinel. Empty and `{`-bearing inputs are rejected before any
    /// base64 work happens.
    pub fn decode(&self, blob: &str) -> DecodedPresence {
        let blob = blob.trim();
        if blob.is_empty() || blob.contains('{') {
            return DecodedPresence::invalid();
        }

        let payload = match self.decode_payload(blob) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!(error = %e, "presence blob did not decode");
                return DecodedPresence::invalid();
            }
        };

        DecodedPresence {
            session_state: extract_session_state(&payload),
            party_id: payload.party_id().cloned(),
            party_size: payload.party_size().unwrap_or(0),
            queue_id: payload.queue_id().cloned(),
            // A missing flag counts as valid; only an explicit `false` flips it.
            is_valid: payload.is_valid.unwrap_or(true),
        }
    }

    /// Strict variant of [`decode`](Self::decode) that reports why a blob
    /// was rejected.
    pub fn decode_payload(&self, blob: &str) -> Result<PresencePayload, ProtocolError> {
        let bytes = STANDARD.decode(blob.trim())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Encodes a decoded presence back into a private blob, using the
    /// nested layout.
    pub fn encode(&self, presence: &DecodedPresence) -> Result<String, ProtocolError> {
        let payload = PresencePayload {
            is_valid: Some(presence.is_valid),
            match_presence_data: Some(MatchPresenceData {
                session_loop_state: presence.session_state.clone(),
                queue_id: presence.queue_id.clone(),
            }),
            party_presence_data: Some(PartyPresenceData {
                party_id: presence.party_id.clone(),
                party_size: Some(presence.party_size),
            }),
            ..PresencePayload::default()
        };
        let json = serde_json::to_vec(&payload)?;
        Ok(STANDARD.encode(json))
    }
}

/// Extracts the session state from a decoded payload.
///
/// Checks `matchPresenceData.sessionLoopState`, then the top-level
/// `sessionLoopState`. When neither is present a structural-mismatch
/// warning is logged and `None` is returned.
pub fn extract_session_state(payload: &PresencePayload) -> Option<SessionState> {
    match payload.session_state() {
        Some((shape, state)) => {
            tracing::trace!(?shape, %state, "session state located");
            Some(state.clone())
        }
        None => {
            tracing::warn!(
                has_match_block = payload.match_presence_data.is_some(),
                "presence payload matches neither known layout; no session state"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(json: &str) -> String {
        STANDARD.encode(json.as_bytes())
    }

    #[test]
    fn test_decode_nested_layout_reads_match_and_party_blocks() {
        let blob = b64(
            r#"{"isValid":true,
                "matchPresenceData":{"sessionLoopState":"INGAME","queueId":"competitive"},
                "partyPresenceData":{"partyId":"p-1","partySize":3}}"#,
        );

        let decoded = PresenceCodec.decode(&blob);

        assert!(decoded.is_valid);
        assert_eq!(decoded.session_state, Some(SessionState::InGame));
        assert_eq!(decoded.party_id.as_deref(), Some("p-1"));
        assert_eq!(decoded.party_size, 3);
        assert_eq!(decoded.queue_id.as_deref(), Some("competitive"));
    }

    #[test]
    fn test_decode_flat_layout_reads_top_level_fields() {
        let blob = b64(r#"{"sessionLoopState":"PREGAME","partyId":"p-2","partySize":1}"#);

        let decoded = PresenceCodec.decode(&blob);

        assert!(decoded.is_valid, "missing isValid counts as valid");
        assert_eq!(decoded.session_state, Some(SessionState::Pregame));
        assert_eq!(decoded.party_id.as_deref(), Some("p-2"));
    }

    #[test]
    fn test_decode_nested_state_wins_over_flat() {
        let blob = b64(
            r#"{"sessionLoopState":"MENUS","matchPresenceData":{"sessionLoopState":"INGAME"}}"#,
        );
        assert_eq!(
            PresenceCodec.decode(&blob).session_state,
            Some(SessionState::InGame)
        );
    }

    #[test]
    fn test_decode_explicit_invalid_flag_keeps_fields() {
        let blob = b64(r#"{"isValid":false,"sessionLoopState":"MENUS","partySize":2}"#);

        let decoded = PresenceCodec.decode(&blob);

        assert!(!decoded.is_valid);
        assert_eq!(decoded.session_state, Some(SessionState::Menus));
        assert_eq!(decoded.party_size, 2);
    }

    #[test]
    fn test_decode_empty_or_brace_input_returns_sentinel() {
        for input in ["", "   ", "{\"isValid\":true}", "e30{"] {
            assert_eq!(
                PresenceCodec.decode(input),
                DecodedPresence::invalid(),
                "input {input:?}"
            );
        }
    }

    #[test]
    fn test_decode_garbage_returns_sentinel() {
        // Valid base64 wrapping non-JSON bytes, and invalid base64.
        let inputs = [
            b64("not json at all"),
            b64("[1,2,3"),
            STANDARD.encode([0xff, 0xfe, 0x00, 0x10]),
            "!!!not-base64!!!".to_string(),
        ];
        for input in inputs {
            let decoded = PresenceCodec.decode(&input);
            assert!(!decoded.is_valid, "input {input:?}");
            assert_eq!(decoded.party_id, None);
            assert_eq!(decoded.party_size, 0);
        }
    }

    #[test]
    fn test_extract_session_state_neither_shape_returns_none() {
        let payload = PresencePayload {
            match_presence_data: Some(MatchPresenceData::default()),
            ..Default::default()
        };
        assert_eq!(extract_session_state(&payload), None);
    }

    #[test]
    fn test_decode_payload_reports_base64_error() {
        let err = PresenceCodec.decode_payload("%%%").unwrap_err();
        assert!(matches!(err, ProtocolError::Base64(_)));
    }

    #[test]
    fn test_encode_then_decode_preserves_presence() {
        let presence = DecodedPresence {
            session_state: Some(SessionState::InGame),
            party_id: Some("party".into()),
            party_size: 4,
            queue_id: Some("unrated".into()),
            is_valid: true,
        };

        let blob = PresenceCodec.encode(&presence).unwrap();

        assert_eq!(PresenceCodec.decode(&blob), presence);
    }
}
