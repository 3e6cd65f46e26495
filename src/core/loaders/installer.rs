use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::launch::Library;

use super::{context::InstallContext, fabric::FabricInstaller};

/// What a loader adds to a vanilla launch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoaderInstallResult {
    pub main_class: Option<String>,
    /// Appended after the platform JVM arguments.
    pub jvm_args: Vec<String>,
    /// Merged with the vanilla libraries before arbitration.
    pub libraries: Vec<Library>,
}

#[async_trait]
pub trait LoaderInstaller: Send + Sync {
    async fn install(&self, ctx: InstallContext<'_>) -> LauncherResult<LoaderInstallResult>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    Fabric,
}

impl fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderKind::Fabric => f.write_str("fabric"),
        }
    }
}

impl FromStr for LoaderKind {
    type Err = LauncherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fabric" => Ok(LoaderKind::Fabric),
            other => Err(LauncherError::Loader(format!("unsupported loader '{}'", other))),
        }
    }
}

/// Loader requested for a version: name plus loader version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderSpec {
    #[serde(rename = "type")]
    pub kind: LoaderKind,
    pub version: String,
}

impl LoaderSpec {
    pub fn fabric(version: impl Into<String>) -> Self {
        Self {
            kind: LoaderKind::Fabric,
            version: version.into(),
        }
    }
}

/// Loader handle carried by a version descriptor. Its contributions are
/// empty until the install step has run.
#[derive(Debug, Clone, PartialEq)]
pub struct Loader {
    spec: LoaderSpec,
    installed: Option<LoaderInstallResult>,
}

impl Loader {
    pub fn new(spec: LoaderSpec) -> Self {
        Self {
            spec,
            installed: None,
        }
    }

    pub fn spec(&self) -> &LoaderSpec {
        &self.spec
    }

    pub fn is_installed(&self) -> bool {
        self.installed.is_some()
    }

    pub fn contributed_libraries(&self) -> &[Library] {
        self.installed
            .as_ref()
            .map_or(&[][..], |r| r.libraries.as_slice())
    }

    pub fn contributed_jvm_args(&self) -> &[String] {
        self.installed
            .as_ref()
            .map_or(&[][..], |r| r.jvm_args.as_slice())
    }

    pub fn main_class_override(&self) -> Option<&str> {
        self.installed.as_ref()?.main_class.as_deref()
    }

    pub(crate) fn record_install(&mut self, result: LoaderInstallResult) {
        self.installed = Some(result);
    }

    /// Installer for this loader.
    pub fn installer(&self, maven_url: &str) -> Installer {
        match self.spec.kind {
            LoaderKind::Fabric => Installer::Fabric(FabricInstaller::new(maven_url)),
        }
    }
}

/// Static dispatch over the supported installers.
pub enum Installer {
    Fabric(FabricInstaller),
}

impl Installer {
    pub async fn install(&self, ctx: InstallContext<'_>) -> LauncherResult<LoaderInstallResult> {
        match self {
            Installer::Fabric(i) => i.install(ctx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contributions_are_empty_before_install() {
        let mut loader = Loader::new(LoaderSpec::fabric("0.15.11"));
        assert!(loader.contributed_libraries().is_empty());
        assert_eq!(loader.main_class_override(), None);

        loader.record_install(LoaderInstallResult {
            main_class: Some("net.fabricmc.loader.impl.launch.knot.KnotClient".into()),
            jvm_args: vec!["-DFabricMcEmu= net.minecraft.client.main.Main ".into()],
            libraries: vec![Library::new("fabric-loader", "0.15.11", "/l/fabric-loader.jar")],
        });
        assert!(loader.is_installed());
        assert_eq!(loader.contributed_jvm_args().len(), 1);
        assert_eq!(
            loader.main_class_override(),
            Some("net.fabricmc.loader.impl.launch.knot.KnotClient")
        );
    }

    #[test]
    fn loader_kind_from_name() {
        assert_eq!("Fabric".parse::<LoaderKind>().unwrap(), LoaderKind::Fabric);
        assert!("forge".parse::<LoaderKind>().is_err());
    }
}
