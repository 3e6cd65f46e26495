// ─── Classpath Resolver ───
// Deduplicates the library set by artifact and joins the survivors into a
// classpath string.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::platform::Platform;
use crate::core::version::{rules_allow, Rule};

/// Artifact group used for the client jar.
pub const CLIENT_JAR_GROUP: &str = "minecraft-client";

/// A classpath candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Library {
    /// Artifact name (`lwjgl`, `guava`, ...). Libraries sharing it compete.
    pub group: String,
    pub version: String,
    pub path: PathBuf,
    pub rules: Vec<Rule>,
}

impl Library {
    pub fn new(group: impl Into<String>, version: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            path: path.into(),
            rules: Vec::new(),
        }
    }

    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }

    /// Build from a Maven repository path such as
    /// `org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1.jar`: the artifact directory is the
    /// group, the directory below it the version.
    pub fn from_repository_path(libs_dir: &Path, relative: &str) -> Option<Self> {
        let segments: Vec<&str> = relative
            .split(['/', '\\'])
            .filter(|s| !s.is_empty())
            .collect();
        if segments.len() < 3 {
            return None;
        }
        let n = segments.len();
        Some(Self::new(segments[n - 3], segments[n - 2], libs_dir.join(relative)))
    }

    pub fn applies(&self, platform: Platform) -> bool {
        rules_allow(&self.rules, platform)
    }
}

/// Turn a dotted version into a comparable integer: every segment is
/// zero-padded to two digits and the results concatenated, so `3.3.2` becomes
/// `030302`. Anything that is not purely numeric segments yields 0.
///
/// Segments of three or more digits are not truncated and therefore sort
/// out of order (`1.100` < `2.0`).
pub fn parse_version_key(version: &str) -> u64 {
    let mut digits = String::with_capacity(version.len() * 2);
    for segment in version.split('.') {
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return 0;
        }
        digits.push_str(&format!("{:0>2}", segment));
    }
    digits.parse().unwrap_or(0)
}

/// Keep, for each artifact group, only the members carrying the highest
/// version key. Input order is preserved among the survivors.
pub fn resolve_libraries(libraries: Vec<Library>) -> Vec<Library> {
    let mut best: HashMap<&str, u64> = HashMap::new();
    for lib in &libraries {
        let key = parse_version_key(&lib.version);
        best.entry(lib.group.as_str())
            .and_modify(|k| *k = (*k).max(key))
            .or_insert(key);
    }

    let winners: Vec<bool> = libraries
        .iter()
        .map(|lib| best.get(lib.group.as_str()) == Some(&parse_version_key(&lib.version)))
        .collect();

    libraries
        .into_iter()
        .zip(winners)
        .filter_map(|(lib, keep)| {
            if !keep {
                debug!("Dropping {} {} (newer version present)", lib.group, lib.version);
            }
            keep.then_some(lib)
        })
        .collect()
}

/// Join library paths with `separator`. Every path must exist; duplicate
/// paths are listed once.
pub fn build_classpath(libraries: &[Library], separator: &str) -> LauncherResult<String> {
    let mut seen = std::collections::HashSet::new();
    let mut entries = Vec::with_capacity(libraries.len());
    for lib in libraries {
        if !lib.path.exists() {
            return Err(LauncherError::MissingLibrary(lib.path.clone()));
        }
        if seen.insert(lib.path.as_path()) {
            entries.push(lib.path.to_string_lossy().into_owned());
        }
    }
    Ok(entries.join(separator))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_keys_are_padded_concatenations() {
        assert_eq!(parse_version_key("3.3.2"), 30302);
        assert_eq!(parse_version_key("1.20.1"), 12001);
        assert_eq!(parse_version_key("0.15.11"), 1511);
        assert!(parse_version_key("3.3.2") > parse_version_key("3.3.1"));
    }

    #[test]
    fn non_numeric_versions_sort_lowest() {
        assert_eq!(parse_version_key("0.12.5+mixin.0.8.5"), 0);
        assert_eq!(parse_version_key("1.0-SNAPSHOT"), 0);
        assert_eq!(parse_version_key(""), 0);
        assert_eq!(parse_version_key("1..2"), 0);
    }

    #[test]
    fn three_digit_segments_keep_their_quirk() {
        // 1.100 -> 1100, 2.0 -> 200, 1.99.9 -> 19909
        assert!(parse_version_key("1.100") > parse_version_key("2.0"));
        assert!(parse_version_key("1.100") < parse_version_key("1.99.9"));
    }

    #[test]
    fn highest_version_wins_per_group() {
        let libs = vec![
            Library::new("lwjgl", "3.3.1", "/l/lwjgl-3.3.1.jar"),
            Library::new("guava", "31.1", "/l/guava-31.1.jar"),
            Library::new("lwjgl", "3.3.2", "/l/lwjgl-3.3.2.jar"),
        ];
        let resolved = resolve_libraries(libs);
        let paths: Vec<_> = resolved.iter().map(|l| l.path.to_str().unwrap()).collect();
        assert_eq!(paths, vec!["/l/guava-31.1.jar", "/l/lwjgl-3.3.2.jar"]);
    }

    #[test]
    fn all_members_of_the_winning_version_survive() {
        let libs = vec![
            Library::new("lwjgl", "3.3.2", "/l/lwjgl-3.3.2.jar"),
            Library::new("lwjgl", "3.3.2", "/l/lwjgl-3.3.2-natives-linux.jar"),
            Library::new("lwjgl", "3.2.2", "/l/lwjgl-3.2.2.jar"),
        ];
        assert_eq!(resolve_libraries(libs).len(), 2);
    }

    #[test]
    fn library_from_repository_path() {
        let lib = Library::from_repository_path(
            Path::new("/data/libraries"),
            "org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1-natives-linux.jar",
        )
        .unwrap();
        assert_eq!(lib.group, "lwjgl");
        assert_eq!(lib.version, "3.3.1");
        assert!(Library::from_repository_path(Path::new("/x"), "a.jar").is_none());
    }

    #[test]
    fn classpath_requires_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jar");
        let b = dir.path().join("b.jar");
        std::fs::write(&a, b"").unwrap();
        std::fs::write(&b, b"").unwrap();

        let libs = vec![
            Library::new("a", "1", &a),
            Library::new("b", "1", &b),
            Library::new("a-dup", "1", &a),
        ];
        let cp = build_classpath(&libs, ":").unwrap();
        assert_eq!(cp, format!("{}:{}", a.display(), b.display()));

        let missing = vec![Library::new("c", "1", dir.path().join("c.jar"))];
        assert!(matches!(
            build_classpath(&missing, ":"),
            Err(LauncherError::MissingLibrary(_))
        ));
    }
}
