pub mod descriptor;
pub mod manifest;
pub mod resolver;
pub mod version_file;

pub use descriptor::{AssetIndexRef, LaunchArguments, RuntimeComponent, VersionDescriptor};
pub use manifest::{ReleaseType, VersionEntry, VersionIndex, VERSION_INDEX_URL};
pub use resolver::{VersionResolver, METADATA_STAGE};
pub use version_file::{
    rules_allow, ArgumentValue, Arguments, AssetIndexInfo, DownloadArtifact, LibDownloadArtifact,
    LibraryEntry, OneOrMany, OsRule, Rule, RuleAction, VersionJson,
};
