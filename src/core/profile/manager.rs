use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::model::{Profile, PROFILE_FILE};
use crate::core::error::{LauncherError, LauncherResult};

/// Profiles known on disk, keyed by id.
pub struct ProfileStore {
    profiles_dir: PathBuf,
    profiles: HashMap<String, Profile>,
}

impl ProfileStore {
    /// Open the store, scanning every directory under `profiles_dir`.
    pub async fn open(profiles_dir: PathBuf) -> LauncherResult<Self> {
        create_dir_safe(&profiles_dir).await?;
        let mut store = Self {
            profiles_dir,
            profiles: HashMap::new(),
        };
        store.reload().await?;
        Ok(store)
    }

    pub fn profiles_dir(&self) -> &Path {
        &self.profiles_dir
    }

    /// Re-scan the profiles directory.
    pub async fn reload(&mut self) -> LauncherResult<()> {
        self.profiles.clear();
        let mut entries = tokio::fs::read_dir(&self.profiles_dir)
            .await
            .map_err(|e| LauncherError::io(&self.profiles_dir, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| LauncherError::io(&self.profiles_dir, e))?
        {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(id) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            let profile = read_profile(&id, &path).await;
            self.profiles.insert(id, profile);
        }
        info!("Loaded {} profiles", self.profiles.len());
        Ok(())
    }

    pub fn exists(&self, id: &str) -> bool {
        self.profiles.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Profile> {
        self.profiles.get(id)
    }

    /// Profiles sorted by id.
    pub fn list(&self) -> Vec<&Profile> {
        let mut all: Vec<&Profile> = self.profiles.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Look up a profile, creating its directory on first reference.
    pub async fn get_or_create(&mut self, id: &str) -> LauncherResult<Profile> {
        validate_id(id)?;
        if let Some(profile) = self.profiles.get(id) {
            return Ok(profile.clone());
        }
        let path = self.profiles_dir.join(id);
        create_dir_safe(&path).await?;
        let profile = Profile::new(id, path);
        self.save(&profile).await?;
        info!("Created profile '{}'", id);
        Ok(profile)
    }

    /// Persist `profile.json` and refresh the cached entry.
    pub async fn save(&mut self, profile: &Profile) -> LauncherResult<()> {
        let json = serde_json::to_string_pretty(profile)?;
        let config_path = profile.config_path();
        tokio::fs::write(&config_path, json)
            .await
            .map_err(|e| LauncherError::io(config_path, e))?;
        self.profiles.insert(profile.id.clone(), profile.clone());
        Ok(())
    }
}

async fn read_profile(id: &str, path: &Path) -> Profile {
    let config_path = path.join(PROFILE_FILE);
    if let Ok(json) = tokio::fs::read_to_string(&config_path).await {
        match serde_json::from_str::<Profile>(&json) {
            Ok(mut profile) => {
                profile.id = id.to_string();
                profile.path = path.to_path_buf();
                return profile;
            }
            Err(e) => warn!("Corrupt {:?}: {}", config_path, e),
        }
    }
    Profile::new(id, path.to_path_buf())
}

fn validate_id(id: &str) -> LauncherResult<()> {
    let bad = id.trim().is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\', ':']);
    if bad {
        return Err(LauncherError::Other(format!("Invalid profile id '{}'", id)));
    }
    Ok(())
}

async fn create_dir_safe(path: &Path) -> LauncherResult<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| LauncherError::Io {
            path: path.to_path_buf(),
            source,
        })
}
