// ─── Launch Arguments ───
// Rule evaluation for manifest arguments and placeholder substitution.
// Arguments stay a Vec<String> from the manifest to the spawned process.

use std::collections::HashMap;

use crate::core::platform::Platform;
use crate::core::version::{ArgumentValue, Rule, RuleAction};

/// JVM flags always passed first.
pub const DIAGNOSTIC_FLAGS: [&str; 2] = [
    "-Dorg.lwjgl.util.Debug=true",
    "-Dorg.lwjgl.util.DebugLoader=true",
];

/// Caller-chosen launch settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Window size; enables `has_custom_resolution`.
    pub resolution: Option<(u32, u32)>,
    /// Enables `is_demo_user`.
    pub demo: bool,
    /// Adds `-Xmx<n>M`.
    pub max_memory_mb: Option<u32>,
    /// Appended after loader JVM arguments.
    pub extra_jvm_args: Vec<String>,
}

impl LaunchOptions {
    /// Value of a manifest feature flag. Unknown features are off.
    pub fn feature(&self, name: &str) -> bool {
        match name {
            "has_custom_resolution" => self.resolution.is_some(),
            "is_demo_user" => self.demo,
            _ => false,
        }
    }
}

/// A JVM argument applies when one of its allow rules names the host OS, or
/// targets `x86` while running on 32-bit Windows.
pub fn jvm_argument_applies(rules: &[Rule], platform: Platform) -> bool {
    if rules.is_empty() {
        return true;
    }
    rules.iter().any(|rule| {
        if rule.action != RuleAction::Allow {
            return false;
        }
        let Some(os) = &rule.os else {
            return false;
        };
        let name_match = os.name.as_deref() == Some(platform.os_name());
        let x86_match = os.arch.as_deref() == Some("x86") && platform == Platform::Windows86;
        name_match || x86_match
    })
}

/// Game arguments use the usual rule fold, where a rule only matches when all
/// of its features have the requested value.
pub fn game_argument_applies(rules: &[Rule], platform: Platform, options: &LaunchOptions) -> bool {
    if rules.is_empty() {
        return true;
    }
    let mut allowed = false;
    for rule in rules {
        let os_ok = rule.os.as_ref().map_or(true, |os| os.matches(platform));
        let features_ok = rule
            .features
            .as_ref()
            .map_or(true, |f| f.iter().all(|(name, want)| options.feature(name) == *want));
        if os_ok && features_ok {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}

fn flatten<F>(args: &[ArgumentValue], applies: F) -> Vec<String>
where
    F: Fn(&[Rule]) -> bool,
{
    args.iter()
        .flat_map(|arg| match arg {
            ArgumentValue::Plain(s) => vec![s.clone()],
            ArgumentValue::Conditional { rules, value } if applies(rules) => value.values(),
            ArgumentValue::Conditional { .. } => Vec::new(),
        })
        .collect()
}

pub fn evaluate_jvm_arguments(args: &[ArgumentValue], platform: Platform) -> Vec<String> {
    flatten(args, |rules| jvm_argument_applies(rules, platform))
}

pub fn evaluate_game_arguments(
    args: &[ArgumentValue],
    platform: Platform,
    options: &LaunchOptions,
) -> Vec<String> {
    flatten(args, |rules| game_argument_applies(rules, platform, options))
}

/// JVM arguments implied for manifests using `minecraftArguments`.
pub fn legacy_jvm_arguments() -> Vec<String> {
    vec![
        "-Djava.library.path=${natives_directory}".to_string(),
        "-cp".to_string(),
        "${classpath}".to_string(),
    ]
}

/// Tokenize a legacy `minecraftArguments` string. Happens before
/// substitution so values containing spaces stay one argument.
pub fn legacy_game_arguments(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

/// `${name}` → value table.
#[derive(Debug, Clone, Default)]
pub struct Placeholders {
    values: HashMap<String, String>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Replace every known `${key}` in `arg` in one left-to-right pass.
    /// Substituted text is not rescanned; unknown tokens are kept verbatim.
    pub fn substitute(&self, arg: &str) -> String {
        let mut out = String::with_capacity(arg.len());
        let mut rest = arg;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let key = &after[..end];
                    match self.values.get(key) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push_str("${");
                            out.push_str(key);
                            out.push('}');
                        }
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    pub fn substitute_all(&self, args: &[String]) -> Vec<String> {
        args.iter().map(|a| self.substitute(a)).collect()
    }
}
