// ─── Version Descriptor ───
// Everything the installer and the command builder need about one version,
// assembled by the resolver. Read-only apart from the loader hook.

use crate::core::assets::AssetIndex;
use crate::core::java::RuntimeManifest;
use crate::core::loaders::{Loader, LoaderInstallResult};

use super::manifest::ReleaseType;
use super::version_file::{Arguments, DownloadArtifact, LibraryEntry};

#[derive(Debug, Clone)]
pub struct AssetIndexRef {
    pub id: String,
    pub url: String,
    pub index: AssetIndex,
    /// Document as served, written verbatim to `assets/indexes/<id>.json`.
    pub raw: String,
}

#[derive(Debug, Clone)]
pub struct RuntimeComponent {
    pub component: String,
    pub manifest: RuntimeManifest,
}

/// Argument template of a version.
#[derive(Debug, Clone)]
pub enum LaunchArguments {
    Modern(Arguments),
    /// Pre-1.13 `minecraftArguments` string.
    Legacy(String),
}

#[derive(Debug, Clone)]
pub struct VersionDescriptor {
    pub(crate) id: String,
    pub(crate) release_type: ReleaseType,
    pub(crate) main_class: String,
    pub(crate) asset_index: AssetIndexRef,
    pub(crate) libraries: Vec<LibraryEntry>,
    pub(crate) client_jar: DownloadArtifact,
    pub(crate) runtime: RuntimeComponent,
    pub(crate) arguments: LaunchArguments,
    pub(crate) raw_manifest: String,
    pub(crate) loader: Option<Loader>,
}

impl VersionDescriptor {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn release_type(&self) -> ReleaseType {
        self.release_type
    }

    /// Main class to launch, after any loader override.
    pub fn main_class(&self) -> &str {
        self.loader
            .as_ref()
            .and_then(Loader::main_class_override)
            .unwrap_or(&self.main_class)
    }

    pub fn asset_index(&self) -> &AssetIndexRef {
        &self.asset_index
    }

    pub fn libraries(&self) -> &[LibraryEntry] {
        &self.libraries
    }

    pub fn client_jar(&self) -> &DownloadArtifact {
        &self.client_jar
    }

    pub fn runtime(&self) -> &RuntimeComponent {
        &self.runtime
    }

    pub fn arguments(&self) -> &LaunchArguments {
        &self.arguments
    }

    pub fn raw_manifest(&self) -> &str {
        &self.raw_manifest
    }

    pub fn loader(&self) -> Option<&Loader> {
        self.loader.as_ref()
    }

    /// Record what the loader's install step contributed.
    pub(crate) fn apply_loader_install(&mut self, result: LoaderInstallResult) {
        if let Some(loader) = self.loader.as_mut() {
            loader.record_install(result);
        }
    }
}
