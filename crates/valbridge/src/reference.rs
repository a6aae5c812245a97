//! Read-only reference data: agent, map, and competitive tier lookups.
//!
//! Where the data comes from is up to the host: implement
//! [`ReferenceSource`] over whatever content API it uses. The
//! [`ReferenceCache`] loads the catalog once and falls back to a small
//! built-in table when the source is unreachable, so lookups never fail.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::BridgeError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentInfo {
    pub name: String,
    #[serde(default)]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MapInfo {
    pub name: String,
    #[serde(default)]
    pub splash_url: Option<String>,
}

/// Lookup dictionaries keyed the way match payloads refer to things.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReferenceCatalog {
    /// Agent uuid → display data.
    pub agents: HashMap<String, AgentInfo>,
    /// Map asset path (e.g. `/Game/Maps/Ascent/Ascent`) → display data.
    pub maps: HashMap<String, MapInfo>,
    /// Competitive tier number → icon URL.
    pub tiers: HashMap<u32, String>,
}

const FALLBACK_AGENTS: &[(&str, &str)] = &[
    ("add6443a-41bd-e414-f6ad-e58d267f4e95", "Jett"),
    ("320b2a48-4d9b-a075-30f1-1f93a9b638fa", "Sova"),
    ("eb93336a-449b-9c1b-0a54-a891f7921d69", "Phoenix"),
    ("569fdd95-4d10-43ab-ca70-79becc718b46", "Sage"),
    ("9f0d8ba9-4140-b941-57d3-a7ad57c6b417", "Brimstone"),
];

const FALLBACK_MAPS: &[(&str, &str)] = &[
    ("/Game/Maps/Ascent/Ascent", "Ascent"),
    ("/Game/Maps/Duality/Duality", "Bind"),
    ("/Game/Maps/Triad/Triad", "Haven"),
    ("/Game/Maps/Bonsai/Bonsai", "Split"),
];

impl ReferenceCatalog {
    /// The built-in table used when no source is reachable: names only,
    /// no artwork.
    pub fn fallback() -> Self {
        let agents = FALLBACK_AGENTS
            .iter()
            .map(|(id, name)| {
                let info = AgentInfo {
                    name: (*name).to_string(),
                    icon_url: None,
                };
                ((*id).to_string(), info)
            })
            .collect();
        let maps = FALLBACK_MAPS
            .iter()
            .map(|(path, name)| {
                let info = MapInfo {
                    name: (*name).to_string(),
                    splash_url: None,
                };
                ((*path).to_string(), info)
            })
            .collect();
        Self {
            agents,
            maps,
            tiers: HashMap::new(),
        }
    }

    /// Agent display name. Ids are matched case-insensitively.
    pub fn agent_name(&self, id: &str) -> Option<&str> {
        self.agents
            .get(id)
            .or_else(|| self.agents.get(&id.to_ascii_lowercase()))
            .map(|a| a.name.as_str())
    }

    pub fn agent_icon(&self, id: &str) -> Option<&str> {
        self.agents.get(id)?.icon_url.as_deref()
    }

    pub fn map_name(&self, path: &str) -> Option<&str> {
        self.maps.get(path).map(|m| m.name.as_str())
    }

    pub fn map_splash(&self, path: &str) -> Option<&str> {
        self.maps.get(path)?.splash_url.as_deref()
    }

    pub fn tier_icon(&self, tier: u32) -> Option<&str> {
        self.tiers.get(&tier).map(String::as_str)
    }
}

/// Loads a [`ReferenceCatalog`].
pub trait ReferenceSource: Send + Sync + 'static {
    fn load(&self) -> impl Future<Output = Result<ReferenceCatalog, BridgeError>> + Send;
}

/// Loads the catalog on first use and keeps it.
///
/// A failed load is not retried: the fallback catalog is cached instead.
pub struct ReferenceCache<S> {
    source: S,
    catalog: OnceCell<Arc<ReferenceCatalog>>,
}

impl<S: ReferenceSource> ReferenceCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            catalog: OnceCell::new(),
        }
    }

    /// The cached catalog, loading it if this is the first call.
    pub async fn catalog(&self) -> Arc<ReferenceCatalog> {
        let catalog = self
            .catalog
            .get_or_init(|| async {
                match self.source.load().await {
                    Ok(catalog) => Arc::new(catalog),
                    Err(e) => {
                        tracing::warn!(error = %e, "reference data unavailable; using fallback");
                        Arc::new(ReferenceCatalog::fallback())
                    }
                }
            })
            .await;
        Arc::clone(catalog)
    }

    /// `true` once a load has completed.
    pub fn is_loaded(&self) -> bool {
        self.catalog.initialized()
    }
}
