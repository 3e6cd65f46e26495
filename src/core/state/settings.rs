use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::assets::RESOURCES_URL;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::RUNTIME_CATALOG_URL;
use crate::core::maven::FABRIC_MAVEN;
use crate::core::version::VERSION_INDEX_URL;

pub const SETTINGS_FILE: &str = "launcher_settings.json";

/// Remote endpoints of the metadata chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaEndpoints {
    pub version_index_url: String,
    pub runtime_catalog_url: String,
    pub resources_url: String,
    pub fabric_maven_url: String,
}

impl Default for MetaEndpoints {
    fn default() -> Self {
        Self {
            version_index_url: VERSION_INDEX_URL.to_string(),
            runtime_catalog_url: RUNTIME_CATALOG_URL.to_string(),
            resources_url: RESOURCES_URL.to_string(),
            fabric_maven_url: FABRIC_MAVEN.to_string(),
        }
    }
}

impl MetaEndpoints {
    /// Every endpoint below one base URL. Used to point the engine at a mirror.
    pub fn mirrored(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            version_index_url: format!("{}/mc/game/version_manifest.json", base),
            runtime_catalog_url: format!("{}/java-runtime/all.json", base),
            resources_url: format!("{}/resources", base),
            fabric_maven_url: format!("{}/maven", base),
        }
    }
}

/// Persisted launcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    /// Concurrent download workers per stage.
    pub worker_count: usize,
    pub launcher_name: String,
    pub launcher_version: String,
    /// Seconds allowed to establish a connection. Transfers are unbounded.
    pub connect_timeout_secs: u64,
    pub endpoints: MetaEndpoints,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            worker_count: 4,
            launcher_name: "Lodestone".to_string(),
            launcher_version: env!("CARGO_PKG_VERSION").to_string(),
            connect_timeout_secs: 30,
            endpoints: MetaEndpoints::default(),
        }
    }
}

impl LauncherSettings {
    /// Load `launcher_settings.json` from `data_dir`, falling back to defaults
    /// when the file is absent or unreadable.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring malformed {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, data_dir: &Path) -> LauncherResult<()> {
        std::fs::create_dir_all(data_dir).map_err(|e| LauncherError::io(data_dir, e))?;
        let path = data_dir.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| LauncherError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LauncherSettings::load(dir.path());
        assert_eq!(settings.worker_count, 4);
        assert_eq!(settings.endpoints.version_index_url, VERSION_INDEX_URL);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), r#"{"worker_count": 8}"#).unwrap();
        let settings = LauncherSettings::load(dir.path());
        assert_eq!(settings.worker_count, 8);
        assert_eq!(settings.launcher_name, "Lodestone");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LauncherSettings {
            worker_count: 2,
            endpoints: MetaEndpoints::mirrored("http://127.0.0.1:8080/"),
            ..Default::default()
        };
        settings.save(dir.path()).unwrap();
        assert_eq!(LauncherSettings::load(dir.path()), settings);
    }
}
