// ─── Content-Tree Sync ───
// Downloads a remotely described file tree into a scratch workspace and
// commits it into a profile directory. Only the tracked part of a profile
// is compared, deleted and replaced; everything else in it is left alone.

use std::collections::{BTreeMap, VecDeque};
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};
use url::Url;

use super::manager::ProfileStore;
use super::model::{GameTarget, Profile};
use super::workspace::{move_contents, ScratchWorkspace};
use crate::core::downloader::{BatchScheduler, DownloadTask, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::fetch_json;
use crate::core::loaders::{LoaderKind, LoaderSpec};
use crate::core::progress::SharedProgress;

pub const SYNC_STAGE: &str = "Syncing Profile";

/// Remote description of a profile's content.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentTreeManifest {
    #[serde(default)]
    pub description: Option<String>,
    /// Icon path inside the tree.
    #[serde(default)]
    pub icon: Option<String>,
    /// Game version the content is meant to run on.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub loader: Option<ManifestLoader>,
    /// Expected [`tracked_hash`] of the committed tree.
    #[serde(default)]
    pub hash: Option<String>,
    /// Paths covered by the hash and replaced on commit. Defaults to the
    /// top-level entries of `files`.
    #[serde(default)]
    pub tracked: Option<Vec<String>>,
    /// Keyed by path relative to the tree root.
    pub files: BTreeMap<String, ContentTreeNode>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentTreeNode {
    File {
        hash: String,
        #[serde(default)]
        size: Option<u64>,
    },
    Directory {
        #[serde(default)]
        files: BTreeMap<String, ContentTreeNode>,
    },
}

/// `loader` block of a manifest. A `vanilla` type means no loader.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestLoader {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub version: String,
}

impl ManifestLoader {
    pub fn spec(&self) -> LauncherResult<Option<LoaderSpec>> {
        if self.kind.eq_ignore_ascii_case("vanilla") {
            return Ok(None);
        }
        let kind: LoaderKind = self.kind.parse()?;
        if self.version.trim().is_empty() {
            return Err(LauncherError::Loader(format!("{} loader without a version", kind)));
        }
        Ok(Some(LoaderSpec {
            kind,
            version: self.version.clone(),
        }))
    }
}

impl ContentTreeManifest {
    /// The version and loader to install for this content, if named.
    pub fn target(&self) -> LauncherResult<Option<GameTarget>> {
        let Some(version) = self.version.as_deref().filter(|v| !v.trim().is_empty()) else {
            return Ok(None);
        };
        let loader = match &self.loader {
            Some(loader) => loader.spec()?,
            None => None,
        };
        Ok(Some(GameTarget {
            version: version.to_string(),
            loader,
        }))
    }

    pub fn tracked_paths(&self) -> Vec<String> {
        match &self.tracked {
            Some(paths) => paths
                .iter()
                .map(|p| p.trim_matches('/').to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            None => self.files.keys().cloned().collect(),
        }
    }
}

/// Reject absolute paths and parent references so a manifest can never
/// write outside the workspace.
fn checked_relative(path: &str) -> LauncherResult<PathBuf> {
    let candidate = Path::new(path.trim_start_matches('/'));
    let safe = candidate
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !safe || path.trim().is_empty() {
        return Err(LauncherError::ContentSync(format!("unsafe path '{}'", path)));
    }
    Ok(candidate.to_path_buf())
}

// ─── Tracked-content hash ───

/// SHA-256 over the tracked files below `root`: for every regular file,
/// sorted by `/`-separated relative path, the path bytes followed by the
/// file's own SHA-256 digest. Missing tracked paths contribute nothing.
pub fn tracked_hash(root: &Path, tracked: &[String]) -> LauncherResult<String> {
    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for entry in tracked {
        let relative = entry.trim_matches('/');
        if relative.is_empty() {
            continue;
        }
        collect_files(&root.join(checked_relative(relative)?), relative, &mut files)?;
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    files.dedup_by(|a, b| a.0 == b.0);

    let mut digest = Sha256::new();
    for (relative, path) in &files {
        digest.update(relative.as_bytes());
        digest.update(sha256_file(path)?);
    }
    Ok(hex::encode(digest.finalize()))
}

fn collect_files(path: &Path, relative: &str, out: &mut Vec<(String, PathBuf)>) -> LauncherResult<()> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(LauncherError::io(path, e)),
    };
    if metadata.is_file() {
        out.push((relative.to_string(), path.to_path_buf()));
    } else if metadata.is_dir() {
        for entry in std::fs::read_dir(path).map_err(|e| LauncherError::io(path, e))? {
            let entry = entry.map_err(|e| LauncherError::io(path, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            collect_files(&entry.path(), &format!("{}/{}", relative, name), out)?;
        }
    }
    Ok(())
}

fn sha256_file(path: &Path) -> LauncherResult<Vec<u8>> {
    let mut file = std::fs::File::open(path).map_err(|e| LauncherError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(|e| LauncherError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_vec())
}

async fn tracked_hash_async(root: PathBuf, tracked: Vec<String>) -> LauncherResult<String> {
    tokio::task::spawn_blocking(move || tracked_hash(&root, &tracked))
        .await
        .map_err(|e| LauncherError::Other(format!("Task join error: {}", e)))?
}

// ─── Sync ───

pub struct ContentTreeSync<'a> {
    downloader: &'a Downloader,
    scheduler: BatchScheduler,
    temp_root: PathBuf,
}

impl<'a> ContentTreeSync<'a> {
    pub fn new(downloader: &'a Downloader, scheduler: BatchScheduler, temp_root: PathBuf) -> Self {
        Self {
            downloader,
            scheduler,
            temp_root,
        }
    }

    pub async fn fetch_manifest(&self, manifest_url: &str) -> LauncherResult<ContentTreeManifest> {
        fetch_json(self.downloader.client(), manifest_url).await
    }

    /// Fetch the manifest at `manifest_url` and bring profile `profile_id`
    /// in line with it.
    #[instrument(skip(self, store, progress))]
    pub async fn sync(
        &self,
        manifest_url: &str,
        profile_id: &str,
        store: &mut ProfileStore,
        progress: SharedProgress,
    ) -> LauncherResult<Profile> {
        let manifest = self.fetch_manifest(manifest_url).await?;

        if let Some(profile) = self.unchanged(&manifest, profile_id, store).await? {
            info!("Profile '{}' already matches {}", profile_id, manifest_url);
            return Ok(profile);
        }

        let workspace = ScratchWorkspace::create(&self.temp_root).await?;
        if let Err(e) = self
            .materialize(&manifest, manifest_url, &workspace, progress)
            .await
        {
            // Dropping the workspace deletes whatever was downloaded.
            drop(workspace);
            return Err(e);
        }
        self.commit(workspace, &manifest, store, profile_id).await
    }

    /// `Some(profile)` when the profile exists and its tracked content already
    /// hashes to the manifest's declared value.
    async fn unchanged(
        &self,
        manifest: &ContentTreeManifest,
        profile_id: &str,
        store: &ProfileStore,
    ) -> LauncherResult<Option<Profile>> {
        let (Some(declared), Some(profile)) = (manifest.hash.as_deref(), store.get(profile_id)) else {
            return Ok(None);
        };
        let current = tracked_hash_async(profile.path.clone(), manifest.tracked_paths()).await?;
        debug!("Profile '{}' tracked hash {} (declared {})", profile_id, current, declared);
        Ok(current
            .eq_ignore_ascii_case(declared)
            .then(|| profile.clone()))
    }

    /// Breadth-first walk of the tree: directories are created and their
    /// children queued, files are collected and fetched in one batch.
    pub async fn materialize(
        &self,
        manifest: &ContentTreeManifest,
        manifest_url: &str,
        workspace: &ScratchWorkspace,
        progress: SharedProgress,
    ) -> LauncherResult<usize> {
        let base = Url::parse(manifest_url).map_err(|e| LauncherError::InvalidUrl {
            url: manifest_url.to_string(),
            reason: e.to_string(),
        })?;

        let mut queue: VecDeque<(&String, &ContentTreeNode)> = manifest.files.iter().collect();
        let mut tasks = Vec::new();
        while let Some((path, node)) = queue.pop_front() {
            let relative = checked_relative(path)?;
            let dest = workspace.path().join(&relative);
            match node {
                ContentTreeNode::Directory { files } => {
                    tokio::fs::create_dir_all(&dest)
                        .await
                        .map_err(|e| LauncherError::io(&dest, e))?;
                    queue.extend(files.iter());
                }
                ContentTreeNode::File { hash, size } => {
                    let url = base.join(path.trim_start_matches('/')).map_err(|e| {
                        LauncherError::InvalidUrl {
                            url: path.clone(),
                            reason: e.to_string(),
                        }
                    })?;
                    let task = DownloadTask::new(url.as_str(), dest, hash);
                    tasks.push(match size {
                        Some(size) => task.with_size(*size),
                        None => task,
                    });
                }
            }
        }

        let count = tasks.len();
        let downloader = self.downloader.clone();
        let report = self
            .scheduler
            .run(SYNC_STAGE, tasks, progress, move |task| {
                let downloader = downloader.clone();
                async move { downloader.fetch(&task).await }
            })
            .await;

        if !report.all_ok() {
            return Err(LauncherError::ContentSync(format!(
                "{} of {} files failed to download: {:?}",
                report.failed.len(),
                count,
                report.failed
            )));
        }
        Ok(count)
    }

    /// Commit the workspace into the profile. The workspace is deleted
    /// afterwards whether or not the commit succeeded.
    pub async fn commit(
        &self,
        workspace: ScratchWorkspace,
        manifest: &ContentTreeManifest,
        store: &mut ProfileStore,
        profile_id: &str,
    ) -> LauncherResult<Profile> {
        let result = self.commit_into(&workspace, manifest, store, profile_id).await;
        if let Err(e) = workspace.release() {
            tracing::warn!("{}", e);
        }
        result
    }

    async fn commit_into(
        &self,
        workspace: &ScratchWorkspace,
        manifest: &ContentTreeManifest,
        store: &mut ProfileStore,
        profile_id: &str,
    ) -> LauncherResult<Profile> {
        let tracked = manifest.tracked_paths();
        let target = manifest.target()?;

        let mut profile = match store.get(profile_id).cloned() {
            Some(existing) => {
                if let Some(declared) = &manifest.hash {
                    let current = tracked_hash_async(existing.path.clone(), tracked.clone()).await?;
                    if current.eq_ignore_ascii_case(declared) {
                        info!("Profile '{}' unchanged, skipping commit", profile_id);
                        return Ok(existing);
                    }
                }
                for path in &tracked {
                    remove_tracked(&existing.path.join(checked_relative(path)?)).await?;
                }
                existing
            }
            None => store.get_or_create(profile_id).await?,
        };

        let source = workspace.path().to_path_buf();
        let dest = profile.path.clone();
        tokio::task::spawn_blocking(move || move_contents(&source, &dest))
            .await
            .map_err(|e| LauncherError::Other(format!("Task join error: {}", e)))??;

        if let Some(description) = &manifest.description {
            profile.description = description.clone();
        }
        if let Some(icon) = &manifest.icon {
            checked_relative(icon)?;
            profile.icon = Some(icon.trim_start_matches('/').to_string());
        }
        if target.is_some() {
            profile.target = target;
        }
        store.save(&profile).await?;
        info!("Committed content tree into profile '{}'", profile_id);
        Ok(profile)
    }
}

async fn remove_tracked(path: &Path) -> LauncherResult<()> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(LauncherError::io(path, e)),
    };
    let removed = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    removed.map_err(|e| LauncherError::io(path, e))
}
