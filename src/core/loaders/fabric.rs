// ─── Fabric ───
// Runs the official Fabric installer jar against a scratch directory and
// harvests the version profile it writes.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::context::InstallContext;
use super::installer::{LoaderInstallResult, LoaderInstaller};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::launch::Library;
use crate::core::maven::{MavenArtifact, MavenMetadata};
use crate::core::profile::{move_contents, ScratchWorkspace};

const INSTALLER_GROUP: &str = "net.fabricmc";
const INSTALLER_ARTIFACT: &str = "fabric-installer";

/// Version profile written by the installer under
/// `versions/fabric-loader-<loader>-<mc>/`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FabricProfile {
    pub main_class: Option<String>,
    #[serde(default)]
    pub libraries: Vec<FabricLibrary>,
    #[serde(default)]
    pub arguments: Option<FabricArguments>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FabricLibrary {
    pub name: String,
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FabricArguments {
    #[serde(default)]
    pub jvm: Vec<serde_json::Value>,
}

impl FabricProfile {
    pub fn profile_id(minecraft_version: &str, loader_version: &str) -> String {
        format!("fabric-loader-{}-{}", loader_version, minecraft_version)
    }

    /// Plain-string JVM arguments. Rule-guarded entries are not used by
    /// Fabric and are skipped.
    pub fn jvm_args(&self) -> Vec<String> {
        self.arguments
            .as_ref()
            .map(|a| {
                a.jvm
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub struct FabricInstaller {
    maven_url: String,
}

impl FabricInstaller {
    pub fn new(maven_url: &str) -> Self {
        Self {
            maven_url: maven_url.trim_end_matches('/').to_string(),
        }
    }

    async fn download_installer(&self, ctx: &InstallContext<'_>, into: &Path) -> LauncherResult<PathBuf> {
        let client = ctx.downloader.client();
        let metadata_url =
            MavenArtifact::metadata_url(INSTALLER_GROUP, INSTALLER_ARTIFACT, &self.maven_url);
        let metadata = MavenMetadata::fetch(client, &metadata_url).await?;
        let version = metadata.latest()?;
        info!("Using Fabric installer {}", version);

        let artifact = MavenArtifact::new(INSTALLER_GROUP, INSTALLER_ARTIFACT, version);
        let url = artifact.url(&self.maven_url);
        let dest = into.join(artifact.filename());
        let outcome = ctx.downloader.fetch_unverified(&url, &dest).await;
        if !outcome.is_ok() {
            return Err(LauncherError::Fetch { url, outcome });
        }
        Ok(dest)
    }

    async fn run_installer(&self, ctx: &InstallContext<'_>, jar: &Path, dir: &Path) -> LauncherResult<()> {
        debug!("Running {:?} into {:?}", jar, dir);
        let output = tokio::process::Command::new(ctx.java_path)
            .arg("-jar")
            .arg(jar)
            .arg("client")
            .arg("-dir")
            .arg(dir)
            .arg("-mcversion")
            .arg(ctx.minecraft_version)
            .arg("-loader")
            .arg(ctx.loader_version)
            .arg("-noprofile")
            .arg("-snapshot")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| LauncherError::JavaExecution(format!("{:?}: {}", ctx.java_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LauncherError::Loader(format!(
                "Fabric installer exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    /// Make sure every library of the profile is present under `libraries_dir`.
    async fn ensure_libraries(
        &self,
        ctx: &InstallContext<'_>,
        profile: &FabricProfile,
    ) -> LauncherResult<Vec<Library>> {
        let mut libraries = Vec::with_capacity(profile.libraries.len());
        for lib in &profile.libraries {
            let artifact = MavenArtifact::parse(&lib.name)?;
            let dest = ctx.libraries_dir.join(artifact.local_path());
            if !dest.exists() {
                let repo = lib.url.as_deref().unwrap_or(&self.maven_url);
                let url = artifact.url(repo);
                let outcome = ctx.downloader.fetch_unverified(&url, &dest).await;
                if !outcome.is_ok() {
                    return Err(LauncherError::Fetch { url, outcome });
                }
            }
            libraries.push(Library::new(&artifact.artifact_id, &artifact.version, dest));
        }
        Ok(libraries)
    }
}

#[async_trait]
impl LoaderInstaller for FabricInstaller {
    async fn install(&self, ctx: InstallContext<'_>) -> LauncherResult<LoaderInstallResult> {
        info!(
            "Installing Fabric {} for Minecraft {}",
            ctx.loader_version, ctx.minecraft_version
        );
        let workspace = ScratchWorkspace::create(ctx.temp_dir).await?;
        let dir = workspace.path().to_path_buf();

        let jar = self.download_installer(&ctx, &dir).await?;
        self.run_installer(&ctx, &jar, &dir).await?;

        let staged_libs = dir.join("libraries");
        if staged_libs.is_dir() {
            let target = ctx.libraries_dir.to_path_buf();
            tokio::task::spawn_blocking(move || move_contents(&staged_libs, &target))
                .await
                .map_err(|e| LauncherError::Other(e.to_string()))??;
        }

        let id = FabricProfile::profile_id(ctx.minecraft_version, ctx.loader_version);
        let profile_path = dir.join("versions").join(&id).join(format!("{}.json", id));
        let raw = tokio::fs::read_to_string(&profile_path)
            .await
            .map_err(|e| LauncherError::io(&profile_path, e))?;
        let profile: FabricProfile = serde_json::from_str(&raw)?;

        let libraries = self.ensure_libraries(&ctx, &profile).await?;
        if let Err(e) = workspace.release() {
            warn!("{}", e);
        }

        info!("Fabric installed with {} libraries", libraries.len());
        Ok(LoaderInstallResult {
            main_class: profile.main_class.clone(),
            jvm_args: profile.jvm_args(),
            libraries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_keeps_string_jvm_args_only() {
        let profile: FabricProfile = serde_json::from_str(
            r#"{
                "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
                "arguments": {
                    "game": [],
                    "jvm": ["-DFabricMcEmu= net.minecraft.client.main.Main ", {"rules": [], "value": "-Xfoo"}]
                },
                "libraries": [
                    {"name": "net.fabricmc:fabric-loader:0.15.11", "url": "https://maven.fabricmc.net/"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(profile.jvm_args(), vec!["-DFabricMcEmu= net.minecraft.client.main.Main "]);
        assert_eq!(profile.libraries.len(), 1);
        assert_eq!(
            FabricProfile::profile_id("1.20.1", "0.15.11"),
            "fabric-loader-0.15.11-1.20.1"
        );
    }

    #[test]
    fn profile_without_arguments() {
        let profile: FabricProfile = serde_json::from_str(r#"{"mainClass": "X"}"#).unwrap();
        assert!(profile.jvm_args().is_empty());
        assert!(profile.libraries.is_empty());
    }
}
