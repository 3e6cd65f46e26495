// ─── Maven Metadata ───
// `maven-metadata.xml` listing published versions of an artifact.

use serde::Deserialize;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::fetch_text;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MavenMetadata {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub versioning: Versioning,
}

#[derive(Debug, Deserialize)]
pub struct Versioning {
    pub latest: Option<String>,
    pub release: Option<String>,
    #[serde(default)]
    pub versions: VersionList,
}

#[derive(Debug, Default, Deserialize)]
pub struct VersionList {
    #[serde(rename = "version", default)]
    pub version: Vec<String>,
}

impl MavenMetadata {
    pub fn parse(xml: &str) -> LauncherResult<Self> {
        Ok(quick_xml::de::from_str(xml)?)
    }

    pub async fn fetch(client: &reqwest::Client, url: &str) -> LauncherResult<Self> {
        Self::parse(&fetch_text(client, url).await?)
    }

    /// `<latest>`, falling back to `<release>` and then the last listed version.
    pub fn latest(&self) -> LauncherResult<&str> {
        self.versioning
            .latest
            .as_deref()
            .or(self.versioning.release.as_deref())
            .or(self.versioning.versions.version.last().map(String::as_str))
            .ok_or_else(|| LauncherError::Metadata("maven-metadata.xml lists no versions".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fabric_installer_metadata() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>net.fabricmc</groupId>
  <artifactId>fabric-installer</artifactId>
  <versioning>
    <latest>1.0.1</latest>
    <release>1.0.1</release>
    <versions>
      <version>0.11.2</version>
      <version>1.0.0</version>
      <version>1.0.1</version>
    </versions>
    <lastUpdated>20240410194000</lastUpdated>
  </versioning>
</metadata>"#;
        let meta = MavenMetadata::parse(xml).unwrap();
        assert_eq!(meta.artifact_id.as_deref(), Some("fabric-installer"));
        assert_eq!(meta.latest().unwrap(), "1.0.1");
        assert_eq!(meta.versioning.versions.version.len(), 3);
    }

    #[test]
    fn latest_falls_back_to_listing() {
        let xml = "<metadata><versioning><versions><version>2.0</version></versions></versioning></metadata>";
        assert_eq!(MavenMetadata::parse(xml).unwrap().latest().unwrap(), "2.0");
    }
}
