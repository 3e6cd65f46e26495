// ─── Java Runtime ───
// Mojang publishes self-contained Java runtimes per platform. The catalog maps
// platform key → component name → release list; each release points at a
// manifest listing every file, directory and link of that runtime.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::core::downloader::{
    sha1_file, BatchReport, BatchScheduler, DownloadOutcome, DownloadTask, Downloader,
};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::fetch_json;
use crate::core::platform::Platform;
use crate::core::progress::SharedProgress;

pub const RUNTIME_CATALOG_URL: &str = "https://launchermeta.mojang.com/v1/products/java-runtime/2ec0cc96c44e5a76b9c8b7c39df7210883d12871/all.json";

// ─── Catalog ───

/// `all.json`: platform key → component → releases.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct RuntimeCatalog(pub HashMap<String, HashMap<String, Vec<RuntimeRelease>>>);

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeRelease {
    pub manifest: RuntimeFile,
    #[serde(default)]
    pub version: Option<RuntimeVersion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeVersion {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuntimeFile {
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

impl RuntimeCatalog {
    /// First release of `component` for `platform`.
    pub fn release_for(&self, platform: Platform, component: &str) -> LauncherResult<&RuntimeRelease> {
        let unavailable = || LauncherError::RuntimeUnavailable {
            component: component.to_string(),
            platform: platform.to_string(),
        };
        let key = platform.runtime_catalog_key().ok_or_else(unavailable)?;
        self.0
            .get(key)
            .and_then(|components| components.get(component))
            .and_then(|releases| releases.first())
            .ok_or_else(unavailable)
    }
}

// ─── Component manifest ───

/// File listing of one runtime component. Sorted by path so parents are
/// created before their children.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeManifest {
    pub files: BTreeMap<String, RuntimeEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuntimeEntry {
    File {
        #[serde(default)]
        executable: bool,
        downloads: RuntimeDownloads,
    },
    Directory,
    Link {
        target: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuntimeDownloads {
    #[serde(default)]
    pub raw: Option<RuntimeFile>,
    #[serde(default)]
    pub lzma: Option<RuntimeFile>,
}

impl RuntimeManifest {
    pub async fn fetch(client: &reqwest::Client, url: &str) -> LauncherResult<Self> {
        fetch_json(client, url).await
    }
}

/// How one runtime file reaches the disk.
#[derive(Debug, Clone)]
struct RuntimeFileJob {
    dest: PathBuf,
    executable: bool,
    source: RuntimeSource,
}

#[derive(Debug, Clone)]
enum RuntimeSource {
    Raw(RuntimeFile),
    /// Compressed download. `unpacked` is the `raw` descriptor, used to
    /// verify the file on disk when the manifest lists one.
    Lzma {
        archive: RuntimeFile,
        unpacked: Option<RuntimeFile>,
    },
}

// ─── Installer ───

/// Materializes a runtime component manifest under `runtimes/<component>`.
pub struct RuntimeInstaller<'a> {
    pub downloader: &'a Downloader,
    pub scheduler: BatchScheduler,
    pub platform: Platform,
}

impl RuntimeInstaller<'_> {
    #[instrument(skip(self, manifest, progress), fields(files = manifest.files.len()))]
    pub async fn install(
        &self,
        manifest: &RuntimeManifest,
        runtime_root: &Path,
        stage: &str,
        progress: SharedProgress,
    ) -> LauncherResult<BatchReport> {
        tokio::fs::create_dir_all(runtime_root)
            .await
            .map_err(|e| LauncherError::io(runtime_root, e))?;

        let mut jobs = Vec::new();
        let mut links = Vec::new();
        for (relative, entry) in &manifest.files {
            let dest = runtime_root.join(relative);
            match entry {
                RuntimeEntry::Directory => {
                    tokio::fs::create_dir_all(&dest)
                        .await
                        .map_err(|e| LauncherError::io(&dest, e))?;
                }
                RuntimeEntry::File {
                    executable,
                    downloads,
                } => {
                    let source = match (&downloads.raw, &downloads.lzma) {
                        (raw, Some(lzma)) => RuntimeSource::Lzma {
                            archive: lzma.clone(),
                            unpacked: raw.clone(),
                        },
                        (Some(raw), None) => RuntimeSource::Raw(raw.clone()),
                        (None, None) => {
                            warn!("Runtime file {} has no download", relative);
                            continue;
                        }
                    };
                    jobs.push(RuntimeFileJob {
                        dest,
                        executable: *executable && self.platform.needs_exec_bit(),
                        source,
                    });
                }
                RuntimeEntry::Link { target } => links.push((dest, target.clone())),
            }
        }

        info!(
            "Installing runtime into {:?}: {} files, {} links",
            runtime_root,
            jobs.len(),
            links.len()
        );

        let downloader = self.downloader.clone();
        let report = self
            .scheduler
            .run(stage, jobs, progress, move |job| {
                let downloader = downloader.clone();
                async move { install_file(&downloader, job).await }
            })
            .await;

        for (dest, target) in links {
            create_link(&dest, &target).await;
        }

        Ok(report)
    }
}

async fn install_file(downloader: &Downloader, job: RuntimeFileJob) -> DownloadOutcome {
    let outcome = match &job.source {
        RuntimeSource::Raw(file) => {
            let task = DownloadTask::new(&file.url, &job.dest, &file.sha1).with_size(file.size);
            downloader.fetch(&task).await
        }
        RuntimeSource::Lzma { archive, unpacked } => {
            fetch_lzma(downloader, archive, unpacked.as_ref(), &job.dest).await
        }
    };

    if outcome.is_ok() && job.executable {
        if let Err(e) = mark_executable(&job.dest) {
            warn!("Could not mark {:?} executable: {}", job.dest, e);
            return DownloadOutcome::IoError(e.to_string());
        }
    }
    outcome
}

/// Fetch the compressed file next to its destination, then unpack it.
///
/// An existing file is kept only if it matches `unpacked`. Without that
/// descriptor there is nothing to check it against, so it is unpacked again.
async fn fetch_lzma(
    downloader: &Downloader,
    archive: &RuntimeFile,
    unpacked: Option<&RuntimeFile>,
    dest: &Path,
) -> DownloadOutcome {
    if tokio::fs::try_exists(dest).await.unwrap_or(false) {
        match unpacked {
            Some(raw) => match sha1_file(dest).await {
                Ok(actual) if actual.eq_ignore_ascii_case(&raw.sha1) => {
                    return DownloadOutcome::AlreadyValid;
                }
                Ok(_) => debug!("Runtime file {:?} is corrupt, unpacking again", dest),
                Err(e) => warn!("Could not hash {:?}: {}", dest, e),
            },
            None => debug!("No uncompressed hash for {:?}, unpacking again", dest),
        }
        if let Err(e) = tokio::fs::remove_file(dest).await {
            warn!("Could not delete {:?}: {}", dest, e);
            return DownloadOutcome::DeleteFailed(e.to_string());
        }
    }

    let mut compressed = dest.as_os_str().to_owned();
    compressed.push(".lzma");
    let compressed = PathBuf::from(compressed);

    let task = DownloadTask::new(&archive.url, &compressed, &archive.sha1).with_size(archive.size);
    let outcome = downloader.fetch(&task).await;
    if !outcome.is_ok() {
        return outcome;
    }

    let src = compressed.clone();
    let out = dest.to_path_buf();
    let unpacked_len = tokio::task::spawn_blocking(move || decompress_lzma(&src, &out)).await;
    if let Err(e) = tokio::fs::remove_file(&compressed).await {
        warn!("Could not remove {:?}: {}", compressed, e);
    }
    let written = match unpacked_len {
        Ok(Ok(written)) => written,
        Ok(Err(e)) => return DownloadOutcome::IoError(e.to_string()),
        Err(e) => return DownloadOutcome::IoError(e.to_string()),
    };

    let Some(raw) = unpacked else {
        return DownloadOutcome::Success;
    };
    if written != raw.size {
        return DownloadOutcome::SizeMismatch {
            expected: raw.size,
            actual: written,
        };
    }
    match sha1_file(dest).await {
        Ok(actual) if actual.eq_ignore_ascii_case(&raw.sha1) => DownloadOutcome::Success,
        Ok(actual) => {
            warn!("Unpacked {:?} hashes to {}, want {}", dest, actual, raw.sha1);
            DownloadOutcome::HashMismatchRetried
        }
        Err(e) => DownloadOutcome::IoError(e.to_string()),
    }
}

/// Stream-decode `src` into `dest`, returning the unpacked length.
fn decompress_lzma(src: &Path, dest: &Path) -> LauncherResult<u64> {
    let input = std::fs::File::open(src).map_err(|e| LauncherError::io(src, e))?;
    let stream = xz2::stream::Stream::new_lzma_decoder(u64::MAX)
        .map_err(|e| LauncherError::Other(format!("lzma decoder: {}", e)))?;
    let mut decoder = xz2::read::XzDecoder::new_stream(std::io::BufReader::new(input), stream);
    let mut output = std::fs::File::create(dest).map_err(|e| LauncherError::io(dest, e))?;
    std::io::copy(&mut decoder, &mut output).map_err(|e| LauncherError::io(dest, e))
}

fn mark_executable(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(perms.mode() | 0o755);
        std::fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

async fn create_link(dest: &Path, target: &str) {
    #[cfg(unix)]
    {
        if tokio::fs::symlink_metadata(dest).await.is_ok() {
            return;
        }
        if let Some(parent) = dest.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!("Could not create {:?}: {}", parent, e);
                return;
            }
        }
        match tokio::fs::symlink(target, dest).await {
            Ok(()) => debug!("Linked {:?} -> {}", dest, target),
            Err(e) => warn!("Could not link {:?} -> {}: {}", dest, target, e),
        }
    }
    #[cfg(not(unix))]
    debug!("Skipping runtime link {:?} -> {}", dest, target);
}

fn java_exe(platform: Platform) -> &'static str {
    if platform.is_windows() {
        "java.exe"
    } else {
        "java"
    }
}

/// Path of the java executable inside an installed runtime component.
pub fn locate_java_binary(runtime_root: &Path, platform: Platform) -> PathBuf {
    let primary = runtime_root.join("bin").join(java_exe(platform));
    if platform.is_mac() {
        let bundle = runtime_root
            .join("jre.bundle")
            .join("Contents")
            .join("Home")
            .join("bin")
            .join(java_exe(platform));
        if bundle.exists() || !primary.exists() {
            return bundle;
        }
    }
    primary
}
