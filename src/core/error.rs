use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::downloader::DownloadOutcome;

/// Install stages, reported distinctly when one of them aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    Assets,
    Libraries,
    Runtime,
    ClientJar,
    Loader,
}

impl InstallStage {
    /// Label used for progress events.
    pub fn label(self) -> &'static str {
        match self {
            InstallStage::Assets => "Installing Assets",
            InstallStage::Libraries => "Installing Libraries",
            InstallStage::Runtime => "Installing Runtime",
            InstallStage::ClientJar => "Installing ClientJar",
            InstallStage::Loader => "Installing Loader",
        }
    }
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Central error type for the engine.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Fetching {url} did not succeed: {outcome:?}")]
    Fetch { url: String, outcome: DownloadOutcome },

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    // ── Metadata ────────────────────────────────────────
    #[error("Version not found in index: {0}")]
    VersionNotFound(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("No Java runtime '{component}' published for platform {platform}")]
    RuntimeUnavailable { component: String, platform: String },

    // ── Maven ───────────────────────────────────────────
    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── Serialization ───────────────────────────────────
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Install ─────────────────────────────────────────
    #[error("{stage} failed: {source}")]
    StageFailed {
        stage: InstallStage,
        source: Box<LauncherError>,
    },

    #[error("Loader error: {0}")]
    Loader(String),

    // ── Launch ──────────────────────────────────────────
    #[error("Library missing on disk: {0:?}")]
    MissingLibrary(PathBuf),

    #[error("Java execution failed: {0}")]
    JavaExecution(String),

    // ── Profiles ────────────────────────────────────────
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Content sync failed: {0}")]
    ContentSync(String),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl LauncherError {
    /// Wrap an IO error together with the path that caused it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }

    /// Attribute this error to an install stage.
    pub fn in_stage(self, stage: InstallStage) -> Self {
        LauncherError::StageFailed {
            stage,
            source: Box::new(self),
        }
    }

    /// The install stage that failed, if this error came from one.
    pub fn stage(&self) -> Option<InstallStage> {
        match self {
            LauncherError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
