use std::path::Path;

use crate::core::downloader::Downloader;

/// Everything a loader install step may touch.
pub struct InstallContext<'a> {
    pub minecraft_version: &'a str,
    pub loader_version: &'a str,
    /// Java executable of the installed runtime component.
    pub java_path: &'a Path,
    pub libraries_dir: &'a Path,
    /// Parent for scratch workspaces.
    pub temp_dir: &'a Path,
    pub downloader: &'a Downloader,
}
