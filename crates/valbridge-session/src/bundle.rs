//! The credential bundle handed to authenticated endpoint classes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Base64 of the static platform-descriptor JSON the game APIs expect in
/// `X-Riot-ClientPlatform`.
pub const PLATFORM_HEADER: &str = "ew0KCSJwbGF0Zm9ybVR5cGUiOiAiUEMiLA0KCSJwbGF0Zm9ybU9TIjogIldpbmRvd3MiLA0KCSJwbGF0Zm9ybU9TVmVyc2lvbiI6ICIxMC4wLjE5MDQyLjEuMjU2LjY0Yml0IiwNCgkicGxhdGZvcm1DaGlwc2V0IjogIlVua25vd24iDQp9";

/// Routing information for the regional and party hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// e.g. `eu`, `na`, `latam`.
    pub region: String,
    /// e.g. `eu`, `na`. `latam` and `br` share the `na` shard.
    pub shard: String,
}

impl Region {
    pub fn new(region: impl Into<String>, shard: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            shard: shard.into(),
        }
    }
}

/// Short-lived credentials for the authenticated endpoint classes.
///
/// The default value is the empty bundle: what callers get before the
/// first successful exchange and after any failure.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialBundle {
    pub bearer_token: String,
    pub entitlement_jwt: String,
    /// Identifies "self" in presence records.
    pub subject_id: String,
    /// Empty when the client log could not be read.
    pub client_version: String,
    pub platform_header: String,
    pub region: Option<Region>,
}

impl CredentialBundle {
    /// The empty bundle.
    pub fn empty() -> Self {
        Self::default()
    }

    /// `true` when no token has been obtained.
    pub fn is_empty(&self) -> bool {
        self.bearer_token.is_empty()
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &str| if s.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("CredentialBundle")
            .field("bearer_token", &redact(&self.bearer_token))
            .field("entitlement_jwt", &redact(&self.entitlement_jwt))
            .field("subject_id", &self.subject_id)
            .field("client_version", &self.client_version)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}
