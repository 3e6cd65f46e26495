use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::core::downloader::DownloadTask;
use crate::core::error::{LauncherError, LauncherResult};

pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";

/// Asset index document. Objects are keyed by their logical name.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndex {
    pub objects: BTreeMap<String, AssetObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl AssetIndex {
    pub fn parse(raw: &str) -> LauncherResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// One task per distinct object, stored content-addressed as
    /// `objects/<hash[0..2]>/<hash>`.
    pub fn download_tasks(&self, objects_dir: &Path, resources_base: &str) -> Vec<DownloadTask> {
        let base = resources_base.trim_end_matches('/');
        let mut seen = std::collections::HashSet::new();
        let mut tasks = Vec::with_capacity(self.objects.len());

        for (name, obj) in &self.objects {
            if obj.hash.len() < 2 || !obj.hash.is_ascii() {
                warn!("Skipping asset '{}' with malformed hash '{}'", name, obj.hash);
                continue;
            }
            if !seen.insert(obj.hash.as_str()) {
                continue;
            }
            let prefix = &obj.hash[..2];
            tasks.push(
                DownloadTask::new(
                    format!("{}/{}/{}", base, prefix, obj.hash),
                    objects_dir.join(prefix).join(&obj.hash),
                    &obj.hash,
                )
                .with_size(obj.size),
            );
        }

        info!(
            "Asset index lists {} objects ({} distinct)",
            self.objects.len(),
            tasks.len()
        );
        tasks
    }

    /// Write the raw index document to `indexes/<id>.json`.
    pub async fn save_raw(raw: &str, indexes_dir: &Path, id: &str) -> LauncherResult<()> {
        tokio::fs::create_dir_all(indexes_dir)
            .await
            .map_err(|e| LauncherError::io(indexes_dir, e))?;
        let path = indexes_dir.join(format!("{}.json", id));
        tokio::fs::write(&path, raw)
            .await
            .map_err(|e| LauncherError::io(path, e))
    }
}
