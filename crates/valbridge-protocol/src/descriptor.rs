//! The session descriptor: how to reach the running game client.
//!
//! While the client runs it writes a single colon-delimited record to a
//! well-known file:
//!
//! ```text
//! Riot Client:12345:54321:s3cr3tp4ss:https
//! │           │     │     │          └─ transport protocol
//! │           │     │     └─ basic-auth password for the local service
//! │           │     └─ loopback port of the local service
//! │           └─ process id
//! └─ identity name
//! ```
//!
//! The record is regenerated (new port, new password) every time the client
//! restarts, so a parsed descriptor is a snapshot, not a stable identity.

use std::fmt;
use std::str::FromStr;

use crate::ProtocolError;

/// Number of colon-separated fields in a descriptor record.
const FIELD_COUNT: usize = 5;

/// A parsed session descriptor.
///
/// Immutable once parsed. All five fields are guaranteed non-empty: a record
/// with any empty field never becomes a `SessionDescriptor` at all.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionDescriptor {
    /// Name of the process that wrote the record.
    pub identity_name: String,
    /// Process id of the local client.
    pub process_id: u32,
    /// Loopback port of the local service.
    pub port: u16,
    /// Password for basic auth against the local service.
    pub password: String,
    /// Usually `https`.
    pub transport_protocol: String,
}

impl SessionDescriptor {
    /// Parses a descriptor record, returning `None` when it is absent or
    /// malformed.
    ///
    /// This is the lenient entry point used by the descriptor store: a
    /// half-written file (the client is mid-restart) reads as "no client"
    /// rather than as an error.
    pub fn parse(record: &str) -> Option<Self> {
        record.parse().ok()
    }

    /// Returns `true` if `other` points at the same running client.
    ///
    /// Only the port is compared: it is the field that changes when the
    /// local service restarts.
    pub fn same_endpoint(&self, other: &SessionDescriptor) -> bool {
        self.port == other.port
    }
}

impl FromStr for SessionDescriptor {
    type Err = ProtocolError;

    fn from_str(record: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = record.trim().split(':').collect();
        if fields.len() != FIELD_COUNT {
            return Err(ProtocolError::Descriptor(format!(
                "expected {FIELD_COUNT} fields, got {}",
                fields.len()
            )));
        }
        if let Some(index) = fields.iter().position(|f| f.is_empty()) {
            return Err(ProtocolError::Descriptor(format!(
                "field {index} is empty"
            )));
        }

        let process_id = fields[1].parse().map_err(|_| {
            ProtocolError::Descriptor(format!(
                "process id {:?} is not a number",
                fields[1]
            ))
        })?;
        let port = fields[2].parse().map_err(|_| {
            ProtocolError::Descriptor(format!(
                "port {:?} is not a number",
                fields[2]
            ))
        })?;

        Ok(Self {
            identity_name: fields[0].to_string(),
            process_id,
            port,
            password: fields[3].to_string(),
            transport_protocol: fields[4].to_string(),
        })
    }
}

/// Re-serializes the record in the on-disk colon format.
impl fmt::Display for SessionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.identity_name,
            self.process_id,
            self.port,
            self.password,
            self.transport_protocol
        )
    }
}

/// `Debug` is hand-written so the password never lands in logs.
impl fmt::Debug for SessionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionDescriptor")
            .field("identity_name", &self.identity_name)
            .field("process_id", &self.process_id)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("transport_protocol", &self.transport_protocol)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = "Riot Client:12345:54321:s3cr3tp4ss:https";

    #[test]
    fn test_parse_well_formed_record_returns_all_fields() {
        let d = SessionDescriptor::parse(RECORD).expect("should parse");

        assert_eq!(d.identity_name, "Riot Client");
        assert_eq!(d.process_id, 12345);
        assert_eq!(d.port, 54321);
        assert_eq!(d.password, "s3cr3tp4ss");
        assert_eq!(d.transport_protocol, "https");
    }

    #[test]
    fn test_parse_then_display_round_trips() {
        let records = [
            RECORD,
            "LeagueClient:1:2999:abc:http",
            "x:4294967295:65535:p-_w0rd:https",
        ];
        for record in records {
            let d = SessionDescriptor::parse(record).expect("should parse");
            assert_eq!(d.to_string(), record);
            assert_eq!(SessionDescriptor::parse(&d.to_string()), Some(d));
        }
    }

    #[test]
    fn test_parse_trims_trailing_newline() {
        let d = SessionDescriptor::parse(&format!("{RECORD}\n"));
        assert_eq!(d.map(|d| d.transport_protocol), Some("https".into()));
    }

    #[test]
    fn test_parse_empty_field_returns_none() {
        assert!(SessionDescriptor::parse("Riot Client:12345:54321::https").is_none());
        assert!(SessionDescriptor::parse(":12345:54321:pw:https").is_none());
    }

    #[test]
    fn test_parse_wrong_field_count_returns_none() {
        assert!(SessionDescriptor::parse("").is_none());
        assert!(SessionDescriptor::parse("a:1:2:pw").is_none());
        assert!(SessionDescriptor::parse("a:1:2:pw:https:extra").is_none());
    }

    #[test]
    fn test_from_str_non_numeric_port_reports_field() {
        let err = "a:1:port:pw:https"
            .parse::<SessionDescriptor>()
            .expect_err("port is not numeric");
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let d = SessionDescriptor::parse(RECORD).unwrap();
        let debug = format!("{d:?}");
        assert!(!debug.contains("s3cr3tp4ss"));
        assert!(debug.contains("54321"));
    }

    #[test]
    fn test_same_endpoint_compares_port_only() {
        let a = SessionDescriptor::parse(RECORD).unwrap();
        let b = SessionDescriptor::parse("Riot Client:999:54321:other:https").unwrap();
        let c = SessionDescriptor::parse("Riot Client:12345:50000:s3cr3tp4ss:https").unwrap();
        assert!(a.same_endpoint(&b));
        assert!(!a.same_endpoint(&c));
    }
}
