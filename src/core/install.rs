// ─── Install Pipeline ───
// Puts a resolved version on disk: assets, libraries (+ natives), the Java
// runtime, the client jar and finally the optional loader. A failing stage
// aborts the install and is reported with its `InstallStage`.

use tracing::{info, instrument, warn};

use crate::core::assets::AssetIndex;
use crate::core::downloader::{BatchReport, BatchScheduler, DownloadTask, Downloader};
use crate::core::error::{InstallStage, LauncherError, LauncherResult};
use crate::core::java::{locate_java_binary, RuntimeInstaller};
use crate::core::launch::extract_natives;
use crate::core::loaders::InstallContext;
use crate::core::platform::Platform;
use crate::core::progress::{SharedProgress, StageProgress};
use crate::core::state::{DataLayout, MetaEndpoints};
use crate::core::version::VersionDescriptor;

pub struct VersionInstaller<'a> {
    layout: &'a DataLayout,
    downloader: &'a Downloader,
    endpoints: &'a MetaEndpoints,
    scheduler: BatchScheduler,
    platform: Platform,
}

impl<'a> VersionInstaller<'a> {
    pub fn new(
        layout: &'a DataLayout,
        downloader: &'a Downloader,
        endpoints: &'a MetaEndpoints,
        scheduler: BatchScheduler,
        platform: Platform,
    ) -> Self {
        Self {
            layout,
            downloader,
            endpoints,
            scheduler,
            platform,
        }
    }

    /// Run every stage in order. The descriptor is only touched by the
    /// loader stage, which records the loader's contributions on it.
    #[instrument(skip_all, fields(version = %descriptor.id()))]
    pub async fn install(
        &self,
        descriptor: &mut VersionDescriptor,
        progress: SharedProgress,
    ) -> LauncherResult<()> {
        self.layout.ensure()?;

        self.install_assets(descriptor, progress.clone())
            .await
            .map_err(|e| e.in_stage(InstallStage::Assets))?;
        self.install_libraries(descriptor, progress.clone())
            .await
            .map_err(|e| e.in_stage(InstallStage::Libraries))?;
        self.install_runtime(descriptor, progress.clone())
            .await
            .map_err(|e| e.in_stage(InstallStage::Runtime))?;
        self.install_client_jar(descriptor, progress.clone())
            .await
            .map_err(|e| e.in_stage(InstallStage::ClientJar))?;
        self.install_loader(descriptor, progress)
            .await
            .map_err(|e| e.in_stage(InstallStage::Loader))?;

        info!("Version {} installed", descriptor.id());
        Ok(())
    }

    async fn install_assets(
        &self,
        descriptor: &VersionDescriptor,
        progress: SharedProgress,
    ) -> LauncherResult<()> {
        let asset_index = descriptor.asset_index();
        AssetIndex::save_raw(
            &asset_index.raw,
            &self.layout.asset_indexes_dir(),
            &asset_index.id,
        )
        .await?;

        let tasks = asset_index
            .index
            .download_tasks(&self.layout.asset_objects_dir(), &self.endpoints.resources_url);
        let report = self.fetch_all(InstallStage::Assets, tasks, progress).await;
        log_report(InstallStage::Assets, &report);
        Ok(())
    }

    async fn install_libraries(
        &self,
        descriptor: &VersionDescriptor,
        progress: SharedProgress,
    ) -> LauncherResult<()> {
        let libs_dir = self.layout.libraries_dir();
        let allowed: Vec<_> = descriptor
            .libraries()
            .iter()
            .filter(|lib| lib.is_allowed(self.platform))
            .collect();

        let tasks: Vec<DownloadTask> = allowed
            .iter()
            .flat_map(|lib| lib.download_tasks(&libs_dir, self.platform))
            .collect();
        let report = self.fetch_all(InstallStage::Libraries, tasks, progress).await;
        log_report(InstallStage::Libraries, &report);

        let native_jars: Vec<_> = allowed
            .iter()
            .flat_map(|lib| lib.native_jars(&libs_dir, self.platform))
            .filter(|jar| jar.exists())
            .collect();
        let extracted =
            extract_natives(native_jars, &self.layout.natives_dir(descriptor.id())).await?;
        info!("Extracted {} native libraries", extracted);
        Ok(())
    }

    async fn install_runtime(
        &self,
        descriptor: &VersionDescriptor,
        progress: SharedProgress,
    ) -> LauncherResult<()> {
        let runtime = descriptor.runtime();
        let installer = RuntimeInstaller {
            downloader: self.downloader,
            scheduler: self.scheduler,
            platform: self.platform,
        };
        let report = installer
            .install(
                &runtime.manifest,
                &self.layout.runtime_dir(&runtime.component),
                InstallStage::Runtime.label(),
                progress,
            )
            .await?;
        log_report(InstallStage::Runtime, &report);
        Ok(())
    }

    async fn install_client_jar(
        &self,
        descriptor: &VersionDescriptor,
        progress: SharedProgress,
    ) -> LauncherResult<()> {
        let tracker = StageProgress::start(InstallStage::ClientJar.label(), 1, progress);
        let id = descriptor.id();
        let jar = descriptor.client_jar();

        let manifest_path = self.layout.version_manifest(id);
        if let Some(parent) = manifest_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }
        tokio::fs::write(&manifest_path, descriptor.raw_manifest())
            .await
            .map_err(|e| LauncherError::io(&manifest_path, e))?;

        let task =
            DownloadTask::new(&jar.url, self.layout.client_jar(id), &jar.sha1).with_size(jar.size);
        let result = self.downloader.fetch_required(&task).await;
        tracker.finish();
        result.map(|_| ())
    }

    async fn install_loader(
        &self,
        descriptor: &mut VersionDescriptor,
        progress: SharedProgress,
    ) -> LauncherResult<()> {
        let Some(loader) = descriptor.loader() else {
            return Ok(());
        };
        let tracker = StageProgress::start(InstallStage::Loader.label(), 1, progress);
        let installer = loader.installer(&self.endpoints.fabric_maven_url);
        let loader_version = loader.spec().version.clone();

        let java_path =
            locate_java_binary(&self.layout.runtime_dir(&descriptor.runtime().component), self.platform);
        let libraries_dir = self.layout.libraries_dir();
        let temp_dir = self.layout.temp_dir();
        let ctx = InstallContext {
            minecraft_version: descriptor.id(),
            loader_version: &loader_version,
            java_path: &java_path,
            libraries_dir: &libraries_dir,
            temp_dir: &temp_dir,
            downloader: self.downloader,
        };
        let result = installer.install(ctx).await;
        tracker.finish();

        descriptor.apply_loader_install(result?);
        Ok(())
    }

    async fn fetch_all(
        &self,
        stage: InstallStage,
        tasks: Vec<DownloadTask>,
        progress: SharedProgress,
    ) -> BatchReport {
        let downloader = self.downloader.clone();
        self.scheduler
            .run(stage.label(), tasks, progress, move |task| {
                let downloader = downloader.clone();
                async move { downloader.fetch(&task).await }
            })
            .await
    }
}

fn log_report(stage: InstallStage, report: &BatchReport) {
    if report.all_ok() {
        info!("{}: {} files ready", stage, report.total);
    } else {
        warn!(
            "{}: {} of {} files failed, they will be retried on the next install",
            stage,
            report.failed.len(),
            report.total
        );
    }
}
