//! Scans the game client's log for its version and region.
//!
//! The client writes both near the top of its log on every launch:
//!
//! ```text
//! LogShooter: Display: CI server version: release-08.07-9-2444158
//! ... https://glz-eu-1.eu.a.pvp.net/session/v1/sessions ...
//! ```

use crate::Region;

const VERSION_MARKER: &str = "CI server version: ";
const SHIPPING_SEGMENT: &str = "shipping";
const REGIONAL_HOST_PREFIX: &str = "https://glz-";
const REGIONAL_HOST_SUFFIX: &str = ".a.pvp.net";

/// What a scan of the client log found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientLogInfo {
    /// Client version in the form the `X-Riot-ClientVersion` header expects.
    pub version: Option<String>,
    pub region: Option<Region>,
}

/// Scans log text for the first version marker and regional host.
pub fn scan(log: &str) -> ClientLogInfo {
    let mut info = ClientLogInfo::default();
    for line in log.lines() {
        if info.version.is_none() {
            if let Some((_, rest)) = line.split_once(VERSION_MARKER) {
                info.version = Some(header_version(rest.trim()));
            }
        }
        if info.region.is_none() {
            info.region = regional_host(line);
        }
        if info.version.is_some() && info.region.is_some() {
            break;
        }
    }
    info
}

/// Inserts the `shipping` segment after the branch:
/// `release-08.07-9-2444158` becomes `release-08.07-shipping-9-2444158`.
fn header_version(raw: &str) -> String {
    let mut parts: Vec<&str> = raw.split('-').collect();
    if parts.len() >= 4 && parts[2] != SHIPPING_SEGMENT {
        parts.insert(2, SHIPPING_SEGMENT);
    }
    parts.join("-")
}

/// Pulls `{region}` and `{shard}` out of `https://glz-{region}-1.{shard}.a.pvp.net`.
fn regional_host(line: &str) -> Option<Region> {
    let (_, rest) = line.split_once(REGIONAL_HOST_PREFIX)?;
    let (host, _) = rest.split_once(REGIONAL_HOST_SUFFIX)?;
    let (region_part, shard) = host.split_once('.')?;
    let (region, _) = region_part.rsplit_once('-')?;
    if region.is_empty() || shard.is_empty() || shard.contains('/') {
        return None;
    }
    Some(Region::new(region, shard))
}
