// ─── Version Index ───
// The top-level Mojang listing: every published version with its type and
// the URL of its manifest.

use serde::Deserialize;
use tracing::info;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::fetch_json;

pub const VERSION_INDEX_URL: &str =
    "https://launchermeta.mojang.com/mc/game/version_manifest.json";

/// Release channel. Anything that is not a snapshot is treated as a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseType {
    Release,
    Snapshot,
}

impl ReleaseType {
    pub fn from_manifest(raw: &str) -> Self {
        if raw == "snapshot" {
            ReleaseType::Snapshot
        } else {
            ReleaseType::Release
        }
    }

    /// Value substituted for `${version_type}`.
    pub fn as_str(self) -> &'static str {
        match self {
            ReleaseType::Release => "release",
            ReleaseType::Snapshot => "snapshot",
        }
    }
}

/// Top-level version index.
#[derive(Debug, Deserialize)]
pub struct VersionIndex {
    #[serde(default)]
    pub latest: Option<LatestVersions>,
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

/// A single entry in the index.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(rename = "releaseTime", default)]
    pub release_time: Option<String>,
}

impl VersionEntry {
    pub fn release_type(&self) -> ReleaseType {
        ReleaseType::from_manifest(&self.version_type)
    }
}

impl VersionIndex {
    pub async fn fetch(client: &reqwest::Client, url: &str) -> LauncherResult<Self> {
        info!("Fetching version index from {}", url);
        let index: VersionIndex = fetch_json(client, url).await?;
        info!("Loaded {} versions from index", index.versions.len());
        Ok(index)
    }

    /// Find a specific version entry by ID (e.g. "1.20.4").
    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }

    pub fn require(&self, id: &str) -> LauncherResult<&VersionEntry> {
        self.find_version(id)
            .ok_or_else(|| LauncherError::VersionNotFound(id.to_string()))
    }
}
