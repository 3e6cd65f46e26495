mod artifact;
mod metadata;

pub use artifact::MavenArtifact;
pub use metadata::MavenMetadata;

/// Maven repository hosting the Fabric installer and loader.
pub const FABRIC_MAVEN: &str = "https://maven.fabricmc.net";
