use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

/// A single file to fetch, keyed by its expected SHA-1 and optional size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub url: String,
    pub dest: PathBuf,
    pub sha1: String,
    pub size: Option<u64>,
}

impl DownloadTask {
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>, sha1: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
            sha1: sha1.into(),
            size: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}

/// Result of one fetch. Failures are values here; the batch scheduler
/// counts them and carries on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Fresh content written and verified.
    Success,
    /// The file on disk already had the expected hash. No request was made.
    AlreadyValid,
    /// The downloaded content failed verification. Not downloaded again;
    /// the next fetch sees a corrupt file and replaces it.
    HashMismatchRetried,
    /// The server announced or delivered a different size than declared.
    SizeMismatch { expected: u64, actual: u64 },
    HttpError(u16),
    IoError(String),
    /// A corrupt file could not be removed before redownloading.
    DeleteFailed(String),
}

impl DownloadOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, DownloadOutcome::Success | DownloadOutcome::AlreadyValid)
    }
}

enum Attempt {
    Written,
    HashMismatch,
    Failed(DownloadOutcome),
}

/// Fetches single files with integrity checks.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    // ── Verified fetch ──────────────────────────────────

    /// Make sure `task.dest` holds the content identified by `task.sha1`.
    ///
    /// An existing valid file is left alone. A corrupt one is deleted and
    /// downloaded again. Either way at most one request is issued: a download
    /// that fails verification is reported, never repeated.
    pub async fn fetch(&self, task: &DownloadTask) -> DownloadOutcome {
        if tokio::fs::try_exists(&task.dest).await.unwrap_or(false) {
            match sha1_file(&task.dest).await {
                Ok(actual) if actual.eq_ignore_ascii_case(&task.sha1) => {
                    debug!("Already valid: {:?}", task.dest);
                    return DownloadOutcome::AlreadyValid;
                }
                Ok(actual) => {
                    debug!(
                        "Hash mismatch for {:?}: expected {}, got {}",
                        task.dest, task.sha1, actual
                    );
                }
                Err(e) => warn!("Could not hash {:?}: {}", task.dest, e),
            }
            if let Err(e) = tokio::fs::remove_file(&task.dest).await {
                warn!("Could not delete corrupt file {:?}: {}", task.dest, e);
                return DownloadOutcome::DeleteFailed(e.to_string());
            }
        }

        match self.attempt(task).await {
            Attempt::Written => DownloadOutcome::Success,
            Attempt::Failed(outcome) => outcome,
            Attempt::HashMismatch => {
                warn!("{} failed verification after download", task.url);
                DownloadOutcome::HashMismatchRetried
            }
        }
    }

    /// One download + verification round.
    async fn attempt(&self, task: &DownloadTask) -> Attempt {
        if let Some(parent) = task.dest.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return Attempt::Failed(DownloadOutcome::IoError(e.to_string()));
            }
        }

        let response = match self.client.get(&task.url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Request to {} failed: {}", task.url, e);
                return Attempt::Failed(DownloadOutcome::IoError(e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Attempt::Failed(DownloadOutcome::HttpError(status.as_u16()));
        }

        if let (Some(expected), Some(announced)) = (task.size, response.content_length()) {
            if expected != announced {
                return Attempt::Failed(DownloadOutcome::SizeMismatch {
                    expected,
                    actual: announced,
                });
            }
        }

        let (written, actual) = match stream_to_file(response, &task.dest).await {
            Ok(v) => v,
            Err(e) => return Attempt::Failed(DownloadOutcome::IoError(e.to_string())),
        };

        if let Some(expected) = task.size {
            if expected != written {
                return Attempt::Failed(DownloadOutcome::SizeMismatch {
                    expected,
                    actual: written,
                });
            }
        }

        if actual.eq_ignore_ascii_case(&task.sha1) {
            debug!("Downloaded: {} -> {:?}", task.url, task.dest);
            Attempt::Written
        } else {
            debug!("Downloaded {} but hash is {} (want {})", task.url, actual, task.sha1);
            Attempt::HashMismatch
        }
    }

    // ── Size-agnostic fetch ─────────────────────────────

    /// Download without any integrity check. Used for artifacts whose hash
    /// is not published, such as loader installers.
    pub async fn fetch_unverified(&self, url: &str, dest: &Path) -> DownloadOutcome {
        if let Some(parent) = dest.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return DownloadOutcome::IoError(e.to_string());
            }
        }
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => return DownloadOutcome::IoError(e.to_string()),
        };
        let status = response.status();
        if !status.is_success() {
            return DownloadOutcome::HttpError(status.as_u16());
        }
        match stream_to_file(response, dest).await {
            Ok(_) => DownloadOutcome::Success,
            Err(e) => DownloadOutcome::IoError(e.to_string()),
        }
    }

    /// Like [`fetch`](Self::fetch) but turns a failed outcome into an error,
    /// for files that a stage cannot do without.
    pub async fn fetch_required(&self, task: &DownloadTask) -> LauncherResult<DownloadOutcome> {
        let outcome = self.fetch(task).await;
        if outcome.is_ok() {
            Ok(outcome)
        } else {
            Err(LauncherError::Fetch {
                url: task.url.clone(),
                outcome,
            })
        }
    }
}

/// Stream the response body to `dest`, hashing on the way.
/// Returns the byte count and the hex SHA-1 of what was written.
async fn stream_to_file(response: reqwest::Response, dest: &Path) -> LauncherResult<(u64, String)> {
    let mut hasher = Sha1::new();
    let mut written = 0u64;
    // Scoped so the handle is closed before anyone re-opens the file.
    {
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| LauncherError::io(dest, e))?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            hasher.update(&chunk);
            written += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .map_err(|e| LauncherError::io(dest, e))?;
        }
        file.flush().await.map_err(|e| LauncherError::io(dest, e))?;
    }
    Ok((written, hex::encode(hasher.finalize())))
}

/// Hex SHA-1 of a file on disk.
pub async fn sha1_file(path: &Path) -> LauncherResult<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| LauncherError::io(path, e))?;
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| LauncherError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sha1_of_known_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();
        assert_eq!(
            sha1_file(&path).await.unwrap(),
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
        );
    }

    #[tokio::test]
    async fn valid_file_needs_no_network() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();

        // Port 9 is discard; any request would fail with an IO error.
        let task = DownloadTask::new(
            "http://127.0.0.1:9/hello.txt",
            &path,
            "AAF4C61DDCC5E8A2DABEDE0F3B482CD9AEA9434D",
        );
        let downloader = Downloader::new(Client::new());
        assert_eq!(downloader.fetch(&task).await, DownloadOutcome::AlreadyValid);
    }

    #[test]
    fn only_success_and_already_valid_are_ok() {
        assert!(DownloadOutcome::Success.is_ok());
        assert!(DownloadOutcome::AlreadyValid.is_ok());
        assert!(!DownloadOutcome::HashMismatchRetried.is_ok());
        assert!(!DownloadOutcome::HttpError(404).is_ok());
    }
}
