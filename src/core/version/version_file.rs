// ─── Version File ───
// Parses a Mojang version manifest and evaluates rules for libraries and
// arguments against the host platform.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::downloader::DownloadTask;
use crate::core::maven::MavenArtifact;
use crate::core::platform::Platform;

/// Runtime component used when a manifest predates `javaVersion`.
pub const LEGACY_RUNTIME_COMPONENT: &str = "jre-legacy";

/// A parsed Mojang version manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub version_type: Option<String>,
    pub main_class: Option<String>,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Legacy `minecraftArguments` field (pre-1.13).
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub java_version: Option<JavaVersionInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub component: String,
    #[serde(default)]
    pub major_version: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionDownloads {
    pub client: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DownloadArtifact {
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<ArgumentValue>,
    #[serde(default)]
    pub jvm: Vec<ArgumentValue>,
}

/// One element of `arguments.game` / `arguments.jvm`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    Plain(String),
    Conditional {
        #[serde(default)]
        rules: Vec<Rule>,
        value: OneOrMany,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn values(&self) -> Vec<String> {
        match self {
            OneOrMany::One(v) => vec![v.clone()],
            OneOrMany::Many(vs) => vs.clone(),
        }
    }
}

// ─── Rules ───

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
    #[serde(default)]
    pub features: Option<HashMap<String, bool>>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
}

impl OsRule {
    pub fn matches(&self, platform: Platform) -> bool {
        let name_ok = self
            .name
            .as_deref()
            .map_or(true, |n| n == platform.os_name());
        let arch_ok = self
            .arch
            .as_deref()
            .map_or(true, |a| a == platform.arch_name());
        name_ok && arch_ok
    }
}

/// Fold a rule list: no rules means allowed, otherwise start disallowed and
/// let every matching rule set the state, top to bottom.
pub fn rules_allow(rules: &[Rule], platform: Platform) -> bool {
    if rules.is_empty() {
        return true;
    }
    let mut allowed = false;
    for rule in rules {
        if rule.os.as_ref().map_or(true, |os| os.matches(platform)) {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}

// ─── Library Entry ───

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryEntry {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Legacy natives map: OS name to classifier template.
    #[serde(default)]
    pub natives: Option<HashMap<String, String>>,
    /// Maven repository for entries without `downloads`.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryDownloads {
    pub artifact: Option<LibDownloadArtifact>,
    #[serde(default)]
    pub classifiers: HashMap<String, LibDownloadArtifact>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LibDownloadArtifact {
    pub path: String,
    pub sha1: String,
    #[serde(default)]
    pub size: Option<u64>,
    pub url: String,
}

impl LibDownloadArtifact {
    pub fn task(&self, libs_dir: &Path) -> DownloadTask {
        let task = DownloadTask::new(&self.url, libs_dir.join(&self.path), &self.sha1);
        match self.size {
            Some(size) => task.with_size(size),
            None => task,
        }
    }
}

impl LibraryEntry {
    pub fn is_allowed(&self, platform: Platform) -> bool {
        rules_allow(&self.rules, platform)
    }

    /// Relative path of the main artifact under `libraries/`.
    pub fn artifact_path(&self) -> Option<String> {
        if let Some(artifact) = self.downloads.as_ref().and_then(|d| d.artifact.as_ref()) {
            return Some(artifact.path.clone());
        }
        MavenArtifact::parse(&self.name)
            .ok()
            .map(|a| a.local_path().to_string_lossy().replace('\\', "/"))
    }

    /// Classifier key for the legacy `natives` map on this platform.
    pub fn legacy_native_classifier(&self, platform: Platform) -> Option<String> {
        self.natives
            .as_ref()?
            .get(platform.os_name())
            .map(|template| template.replace("${arch}", platform.legacy_arch_bits()))
    }

    /// Everything that must be on disk for this library on `platform`.
    pub fn download_tasks(&self, libs_dir: &Path, platform: Platform) -> Vec<DownloadTask> {
        let Some(downloads) = &self.downloads else {
            return Vec::new();
        };
        let mut tasks = Vec::new();
        if let Some(artifact) = &downloads.artifact {
            tasks.push(artifact.task(libs_dir));
        }
        if let Some(native) = self
            .legacy_native_classifier(platform)
            .and_then(|c| downloads.classifiers.get(&c))
        {
            tasks.push(native.task(libs_dir));
        }
        tasks
    }

    /// Natives jars of this library whose classifier targets `platform`.
    pub fn native_jars(&self, libs_dir: &Path, platform: Platform) -> Vec<PathBuf> {
        let mut jars = Vec::new();
        let Some(downloads) = &self.downloads else {
            return jars;
        };

        if let Some(artifact) = &downloads.artifact {
            let classifier = self.name.split(':').nth(3).unwrap_or_default();
            if artifact.path.contains("natives") && platform.matches_natives_classifier(classifier)
            {
                jars.push(libs_dir.join(&artifact.path));
            }
        }

        if let Some(classifier) = self.legacy_native_classifier(platform) {
            if platform.matches_natives_classifier(&classifier) {
                if let Some(native) = downloads.classifiers.get(&classifier) {
                    jars.push(libs_dir.join(&native.path));
                }
            }
        }
        jars
    }
}
