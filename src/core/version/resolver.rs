// ─── Metadata Resolution Chain ───
// version index → version manifest → asset index → runtime catalog → runtime
// manifest. Each request depends on the previous answer, so they run in
// order, and any failure discards everything fetched so far.

use tracing::{info, instrument};

use crate::core::assets::AssetIndex;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::{fetch_json, fetch_text};
use crate::core::java::{RuntimeCatalog, RuntimeManifest};
use crate::core::loaders::{Loader, LoaderSpec};
use crate::core::platform::Platform;
use crate::core::progress::{SharedProgress, StageProgress};
use crate::core::state::MetaEndpoints;

use super::descriptor::{AssetIndexRef, LaunchArguments, RuntimeComponent, VersionDescriptor};
use super::manifest::VersionIndex;
use super::version_file::{VersionJson, LEGACY_RUNTIME_COMPONENT};

pub const METADATA_STAGE: &str = "Loading Version Metadata";

pub struct VersionResolver<'a> {
    client: &'a reqwest::Client,
    endpoints: &'a MetaEndpoints,
    platform: Platform,
}

impl<'a> VersionResolver<'a> {
    pub fn new(client: &'a reqwest::Client, endpoints: &'a MetaEndpoints, platform: Platform) -> Self {
        Self {
            client,
            endpoints,
            platform,
        }
    }

    #[instrument(skip(self, progress))]
    pub async fn resolve(
        &self,
        version_id: &str,
        loader: Option<LoaderSpec>,
        progress: SharedProgress,
    ) -> LauncherResult<VersionDescriptor> {
        let tracker = StageProgress::start(METADATA_STAGE, 4, progress);

        // 1. Version index
        let index = VersionIndex::fetch(self.client, &self.endpoints.version_index_url).await?;
        let entry = index.require(version_id)?;
        let release_type = entry.release_type();
        tracker.tick();

        // 2. Version manifest
        let raw_manifest = fetch_text(self.client, &entry.url).await?;
        let manifest: VersionJson = serde_json::from_str(&raw_manifest)?;
        let parts = ManifestParts::extract(manifest, version_id)?;
        tracker.tick();

        // 3. Asset index
        let raw_index = fetch_text(self.client, &parts.asset_index_url).await?;
        let asset_index = AssetIndex::parse(&raw_index)?;
        tracker.tick();

        // 4. Runtime catalog, then the component's own manifest
        let catalog: RuntimeCatalog =
            fetch_json(self.client, &self.endpoints.runtime_catalog_url).await?;
        let release = catalog.release_for(self.platform, &parts.runtime_component)?;
        let runtime_manifest = RuntimeManifest::fetch(self.client, &release.manifest.url).await?;
        tracker.finish();

        info!(
            "Resolved {} ({}): {} libraries, {} asset objects, runtime {} ({} entries)",
            parts.id,
            release_type.as_str(),
            parts.libraries.len(),
            asset_index.objects.len(),
            parts.runtime_component,
            runtime_manifest.files.len()
        );

        Ok(VersionDescriptor {
            id: parts.id,
            release_type,
            main_class: parts.main_class,
            asset_index: AssetIndexRef {
                id: parts.asset_index_id,
                url: parts.asset_index_url,
                index: asset_index,
                raw: raw_index,
            },
            libraries: parts.libraries,
            client_jar: parts.client_jar,
            runtime: RuntimeComponent {
                component: parts.runtime_component,
                manifest: runtime_manifest,
            },
            arguments: parts.arguments,
            raw_manifest,
            loader: loader.map(Loader::new),
        })
    }
}

/// Required fields of a version manifest, validated up front.
struct ManifestParts {
    id: String,
    main_class: String,
    asset_index_id: String,
    asset_index_url: String,
    libraries: Vec<super::version_file::LibraryEntry>,
    client_jar: super::version_file::DownloadArtifact,
    runtime_component: String,
    arguments: LaunchArguments,
}

impl ManifestParts {
    fn extract(manifest: VersionJson, requested: &str) -> LauncherResult<Self> {
        let missing = |field: &str| {
            LauncherError::Metadata(format!("version manifest for {} lacks {}", requested, field))
        };

        let main_class = manifest.main_class.ok_or_else(|| missing("mainClass"))?;
        let asset_index = manifest.asset_index.ok_or_else(|| missing("assetIndex"))?;
        let client_jar = manifest
            .downloads
            .and_then(|d| d.client)
            .ok_or_else(|| missing("downloads.client"))?;
        let arguments = match (manifest.arguments, manifest.minecraft_arguments) {
            (Some(args), _) => LaunchArguments::Modern(args),
            (None, Some(legacy)) => LaunchArguments::Legacy(legacy),
            (None, None) => return Err(missing("arguments")),
        };
        let runtime_component = manifest
            .java_version
            .map(|j| j.component)
            .unwrap_or_else(|| LEGACY_RUNTIME_COMPONENT.to_string());

        Ok(Self {
            id: manifest.id.unwrap_or_else(|| requested.to_string()),
            main_class,
            asset_index_id: asset_index.id,
            asset_index_url: asset_index.url,
            libraries: manifest.libraries,
            client_jar,
            runtime_component,
            arguments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: serde_json::Value) -> VersionJson {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn legacy_manifest_without_java_version() {
        let parts = ManifestParts::extract(
            parse(serde_json::json!({
                "id": "1.8.9",
                "mainClass": "net.minecraft.client.main.Main",
                "minecraftArguments": "--username ${auth_player_name}",
                "assetIndex": {"id": "1.8", "url": "https://x/1.8.json"},
                "downloads": {"client": {"sha1": "aa", "size": 1, "url": "https://x/client.jar"}}
            })),
            "1.8.9",
        )
        .unwrap();
        assert_eq!(parts.runtime_component, LEGACY_RUNTIME_COMPONENT);
        assert!(matches!(parts.arguments, LaunchArguments::Legacy(_)));
    }

    #[test]
    fn missing_client_download_is_rejected() {
        let err = ManifestParts::extract(
            parse(serde_json::json!({
                "id": "x",
                "mainClass": "Main",
                "arguments": {"game": [], "jvm": []},
                "assetIndex": {"id": "1", "url": "https://x/1.json"}
            })),
            "x",
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("downloads.client"));
    }
}
