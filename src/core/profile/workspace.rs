// ─── Scratch Workspace ───
// A uniquely named directory under `temp/`, removed recursively when
// released or dropped.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug)]
pub struct ScratchWorkspace {
    path: PathBuf,
    released: bool,
}

impl ScratchWorkspace {
    /// Create `temp_root/<millis>-<random>`.
    pub async fn create(temp_root: &Path) -> LauncherResult<Self> {
        let name = format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            &Uuid::new_v4().simple().to_string()[..8]
        );
        let path = temp_root.join(name);
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| LauncherError::io(&path, e))?;
        debug!("Scratch workspace at {:?}", path);
        Ok(Self {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the workspace now and report the outcome.
    pub fn release(mut self) -> LauncherResult<()> {
        self.released = true;
        remove_tree(&self.path)
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = remove_tree(&self.path) {
            warn!("Failed to remove scratch workspace: {}", e);
        }
    }
}

fn remove_tree(path: &Path) -> LauncherResult<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            debug!("Removed scratch workspace {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(LauncherError::io(path, e)),
    }
}

/// Move everything under `source` into `destination`, replacing existing
/// files. Falls back to copy + delete when a rename crosses filesystems.
pub fn move_contents(source: &Path, destination: &Path) -> LauncherResult<()> {
    std::fs::create_dir_all(destination).map_err(|e| LauncherError::io(destination, e))?;
    let entries = std::fs::read_dir(source).map_err(|e| LauncherError::io(source, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| LauncherError::io(source, e))?;
        let src_path = entry.path();
        let dst_path = destination.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(|e| LauncherError::io(&src_path, e))?;

        if file_type.is_dir() {
            if dst_path.is_file() {
                std::fs::remove_file(&dst_path).map_err(|e| LauncherError::io(&dst_path, e))?;
            }
            move_contents(&src_path, &dst_path)?;
        } else {
            if dst_path.is_dir() {
                std::fs::remove_dir_all(&dst_path).map_err(|e| LauncherError::io(&dst_path, e))?;
            } else if dst_path.exists() {
                std::fs::remove_file(&dst_path).map_err(|e| LauncherError::io(&dst_path, e))?;
            }
            if std::fs::rename(&src_path, &dst_path).is_err() {
                std::fs::copy(&src_path, &dst_path).map_err(|e| LauncherError::io(&dst_path, e))?;
                std::fs::remove_file(&src_path).map_err(|e| LauncherError::io(&src_path, e))?;
            }
        }
    }
    Ok(())
}
