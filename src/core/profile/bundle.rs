// ─── Bundle Index ───
// A bundle host lists several remote profiles, optionally restricted to a
// set of player UUIDs. Each profile manifest names the game version and
// loader its content runs on.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::model::GameTarget;
use super::sync::ContentTreeManifest;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::fetch_json;

#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct BundleIndex(pub BTreeMap<String, BundleEntry>);

#[derive(Debug, Clone, Deserialize)]
pub struct BundleEntry {
    /// Content-tree manifest, relative to the index URL.
    pub manifest: String,
    #[serde(rename = "validUUIDs", default)]
    pub valid_uuids: Vec<String>,
}

/// A visible bundle entry with its manifest URL resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleListing {
    pub name: String,
    pub manifest_url: String,
}

/// A profile offered by a bundle, ready to sync and install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteProfile {
    pub name: String,
    pub manifest_url: String,
    pub description: Option<String>,
    pub target: GameTarget,
}

fn normalize_uuid(raw: &str) -> String {
    raw.replace('-', "").to_ascii_lowercase()
}

impl BundleEntry {
    /// Entries without a UUID list are public.
    pub fn visible_to(&self, player_uuid: Option<&str>) -> bool {
        if self.valid_uuids.is_empty() {
            return true;
        }
        let Some(uuid) = player_uuid.map(normalize_uuid) else {
            return false;
        };
        self.valid_uuids.iter().any(|u| normalize_uuid(u) == uuid)
    }
}

impl BundleIndex {
    pub async fn fetch(client: &reqwest::Client, index_url: &str) -> LauncherResult<Self> {
        fetch_json(client, index_url).await
    }

    /// Entries `player_uuid` may see, sorted by name.
    pub fn listings_for(&self, index_url: &str, player_uuid: Option<&str>) -> LauncherResult<Vec<BundleListing>> {
        let base = Url::parse(index_url).map_err(|e| LauncherError::InvalidUrl {
            url: index_url.to_string(),
            reason: e.to_string(),
        })?;

        self.0
            .iter()
            .filter(|(_, entry)| entry.visible_to(player_uuid))
            .map(|(name, entry)| {
                let url = base.join(&entry.manifest).map_err(|e| LauncherError::InvalidUrl {
                    url: entry.manifest.clone(),
                    reason: e.to_string(),
                })?;
                Ok(BundleListing {
                    name: name.clone(),
                    manifest_url: url.to_string(),
                })
            })
            .collect()
    }

    /// Profiles `player_uuid` may install. Entries whose manifest cannot be
    /// read or names no game version are skipped.
    pub async fn profiles_for(
        &self,
        client: &reqwest::Client,
        index_url: &str,
        player_uuid: Option<&str>,
    ) -> LauncherResult<Vec<RemoteProfile>> {
        let mut profiles = Vec::new();
        for listing in self.listings_for(index_url, player_uuid)? {
            let manifest: ContentTreeManifest = match fetch_json(client, &listing.manifest_url).await {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!("Skipping bundle profile '{}': {}", listing.name, e);
                    continue;
                }
            };
            let target = match manifest.target() {
                Ok(Some(target)) => target,
                Ok(None) => {
                    warn!("Skipping bundle profile '{}': no game version", listing.name);
                    continue;
                }
                Err(e) => {
                    warn!("Skipping bundle profile '{}': {}", listing.name, e);
                    continue;
                }
            };
            debug!("Bundle profile '{}' targets {}", listing.name, target.version);
            profiles.push(RemoteProfile {
                name: listing.name,
                manifest_url: listing.manifest_url,
                description: manifest.description,
                target,
            });
        }
        Ok(profiles)
    }
}
