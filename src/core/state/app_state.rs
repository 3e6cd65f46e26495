use std::path::PathBuf;

use reqwest::Client;
use tracing::info;

use super::paths::DataLayout;
use super::settings::LauncherSettings;
use crate::core::downloader::{BatchScheduler, Downloader};
use crate::core::error::LauncherResult;
use crate::core::http::build_http_client;
use crate::core::platform::Platform;
use crate::core::profile::ProfileStore;

/// Everything a command needs: paths, settings, the shared HTTP client and
/// the profile store.
pub struct LauncherState {
    pub layout: DataLayout,
    pub settings: LauncherSettings,
    pub http_client: Client,
    pub downloader: Downloader,
    pub platform: Platform,
    pub profiles: ProfileStore,
}

impl LauncherState {
    /// Open the data directory, creating its folder skeleton, and load the
    /// persisted settings.
    pub async fn open(data_dir: PathBuf) -> LauncherResult<Self> {
        let settings = LauncherSettings::load(&data_dir);
        Self::with_settings(data_dir, settings).await
    }

    pub async fn with_settings(data_dir: PathBuf, settings: LauncherSettings) -> LauncherResult<Self> {
        let layout = DataLayout::new(data_dir);
        layout.ensure()?;

        let http_client = build_http_client(settings.connect_timeout_secs)?;
        let downloader = Downloader::new(http_client.clone());
        let profiles = ProfileStore::open(layout.profiles_dir()).await?;
        let platform = Platform::detect();
        info!(
            "Data directory {:?}, platform {}, {} workers",
            layout.root(),
            platform,
            settings.worker_count
        );

        Ok(Self {
            layout,
            settings,
            http_client,
            downloader,
            platform,
            profiles,
        })
    }

    pub fn scheduler(&self) -> BatchScheduler {
        BatchScheduler::new(self.settings.worker_count)
    }

    pub fn persist_settings(&self) -> LauncherResult<()> {
        self.settings.save(self.layout.root())
    }
}
