use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::loaders::LoaderSpec;

pub const PROFILE_FILE: &str = "profile.json";

/// Game version and loader a profile's content was published for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTarget {
    pub version: String,
    #[serde(default)]
    pub loader: Option<LoaderSpec>,
}

/// A game working directory under `profiles/<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    /// Filled from the store on load; never persisted.
    #[serde(skip)]
    pub path: PathBuf,
    #[serde(default)]
    pub description: String,
    /// Icon file, relative to the profile directory.
    #[serde(default)]
    pub icon: Option<String>,
    /// Set when the profile was synced from a manifest naming a version.
    #[serde(default)]
    pub target: Option<GameTarget>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(id: &str, path: PathBuf) -> Self {
        Self {
            id: id.to_string(),
            path,
            description: String::new(),
            icon: None,
            target: None,
            created_at: Utc::now(),
        }
    }

    pub fn icon_path(&self) -> Option<PathBuf> {
        self.icon.as_ref().map(|icon| self.path.join(icon))
    }

    pub fn config_path(&self) -> PathBuf {
        self.path.join(PROFILE_FILE)
    }

    pub fn dir(&self) -> &Path {
        &self.path
    }
}
