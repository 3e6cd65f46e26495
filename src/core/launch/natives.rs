// ─── Natives ───
// Copies shared libraries out of platform natives jars into the per-version
// natives directory. Entries are flattened to their file name.

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

const NATIVE_EXTENSIONS: [&str; 4] = [".dll", ".so", ".dylib", ".jnilib"];

fn is_native_entry(name: &str) -> bool {
    !name.starts_with("META-INF") && NATIVE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Extract every native library found in `jars` into `natives_dir`.
/// Returns the number of files written. Jars that are missing or unreadable
/// are skipped with a warning.
pub async fn extract_natives(jars: Vec<PathBuf>, natives_dir: &Path) -> LauncherResult<usize> {
    tokio::fs::create_dir_all(natives_dir)
        .await
        .map_err(|e| LauncherError::io(natives_dir, e))?;

    let dest_dir = natives_dir.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut extracted = 0;
        for jar in &jars {
            match extract_one(jar, &dest_dir) {
                Ok(n) => extracted += n,
                Err(e) => warn!("Cannot extract natives from {:?}: {}", jar, e),
            }
        }
        extracted
    })
    .await
    .map_err(|e| LauncherError::Other(format!("Task join error: {}", e)))
}

fn extract_one(jar: &Path, dest_dir: &Path) -> LauncherResult<usize> {
    let file = std::fs::File::open(jar).map_err(|e| LauncherError::io(jar, e))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut extracted = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if !is_native_entry(&name) {
            continue;
        }
        let Some(file_name) = name.rsplit('/').next().filter(|n| !n.is_empty()) else {
            continue;
        };

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| LauncherError::io(jar, e))?;
        let dest = dest_dir.join(file_name);
        std::fs::write(&dest, bytes).map_err(|e| LauncherError::io(&dest, e))?;
        debug!("Extracted native: {}", file_name);
        extracted += 1;
    }
    Ok(extracted)
}
