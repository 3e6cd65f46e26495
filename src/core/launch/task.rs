// ─── Launch Task ───
// Builds the argument vector for a resolved version and supervises the game
// process. The command stays a Vec<String> from manifest to spawn.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use crate::core::auth::PlayerInfo;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::locate_java_binary;
use crate::core::platform::Platform;
use crate::core::profile::Profile;
use crate::core::state::{DataLayout, LauncherSettings};
use crate::core::version::{LaunchArguments, VersionDescriptor};

use super::arguments::{
    evaluate_game_arguments, evaluate_jvm_arguments, legacy_game_arguments, legacy_jvm_arguments,
    LaunchOptions, Placeholders, DIAGNOSTIC_FLAGS,
};
use super::classpath::{build_classpath, resolve_libraries, Library, CLIENT_JAR_GROUP};

/// Lines of game output kept for the exit report.
const OUTPUT_TAIL_LINES: usize = 200;

/// Inputs of one launch.
pub struct LaunchRequest<'a> {
    pub descriptor: &'a VersionDescriptor,
    pub layout: &'a DataLayout,
    pub settings: &'a LauncherSettings,
    pub options: &'a LaunchOptions,
    pub profile: &'a Profile,
    pub player: &'a PlayerInfo,
    pub platform: Platform,
}

/// Fully rendered command. `args[0]` is the java executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub args: Vec<String>,
    pub classpath: String,
    pub working_dir: PathBuf,
    pub natives_dir: PathBuf,
    pub platform: Platform,
}

/// How the game process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameExit {
    pub code: Option<i32>,
    pub success: bool,
    /// Last lines of merged stdout/stderr.
    pub output_tail: Vec<String>,
}

/// Collect the classpath candidates: loader libraries first, then the
/// applicable vanilla libraries, then the client jar.
fn collect_libraries(request: &LaunchRequest<'_>) -> Vec<Library> {
    let descriptor = request.descriptor;
    let libs_dir = request.layout.libraries_dir();
    let mut libraries: Vec<Library> = descriptor
        .loader()
        .map(|l| l.contributed_libraries().to_vec())
        .unwrap_or_default();

    for entry in descriptor.libraries() {
        // Legacy natives-only entries have no classpath artifact.
        let natives_only = entry
            .downloads
            .as_ref()
            .is_some_and(|d| d.artifact.is_none());
        if natives_only {
            continue;
        }
        let Some(relative) = entry.artifact_path() else {
            continue;
        };
        if let Some(lib) = Library::from_repository_path(&libs_dir, &relative) {
            libraries.push(lib.with_rules(entry.rules.clone()));
        }
    }

    libraries.push(Library::new(
        CLIENT_JAR_GROUP,
        descriptor.id(),
        request.layout.client_jar(descriptor.id()),
    ));
    libraries.retain(|lib| lib.applies(request.platform));
    libraries
}

fn placeholders(request: &LaunchRequest<'_>, classpath: &str, natives_dir: &Path) -> Placeholders {
    let descriptor = request.descriptor;
    let player = request.player;
    let assets_root = path_str(&request.layout.assets_dir());
    let mut table = Placeholders::new();
    table
        .set("classpath", classpath)
        .set("classpath_separator", request.platform.classpath_separator())
        .set("natives_directory", path_str(natives_dir))
        .set("library_directory", path_str(&request.layout.libraries_dir()))
        .set("game_directory", path_str(request.profile.dir()))
        .set("assets_root", assets_root.clone())
        .set("game_assets", assets_root)
        .set("assets_index_name", descriptor.asset_index().id.clone())
        .set("version_name", descriptor.id())
        .set("version_type", descriptor.release_type().as_str())
        .set("auth_player_name", player.username.clone())
        .set("auth_uuid", player.uuid_simple())
        .set("auth_access_token", player.access_token.clone())
        .set("auth_session", player.access_token.clone())
        .set("auth_xuid", player.xuid.clone())
        .set("clientid", player.client_id.clone())
        .set("user_type", player.user_type.clone())
        .set("user_properties", "{}")
        .set("launcher_name", request.settings.launcher_name.clone())
        .set("launcher_version", request.settings.launcher_version.clone());
    if let Some((width, height)) = request.options.resolution {
        table
            .set("resolution_width", width.to_string())
            .set("resolution_height", height.to_string());
    }
    table
}

/// Render the launch command.
///
/// Order: java, diagnostic flags, `-Xmx`, platform JVM arguments, loader JVM
/// arguments, caller JVM arguments, main class, game arguments.
/// Placeholders are substituted per argument, never on a joined string.
pub fn build_launch_plan(request: &LaunchRequest<'_>) -> LauncherResult<LaunchPlan> {
    let descriptor = request.descriptor;
    let platform = request.platform;

    let resolved = resolve_libraries(collect_libraries(request));
    let classpath = build_classpath(&resolved, platform.classpath_separator())?;
    let natives_dir = request.layout.natives_dir(descriptor.id());

    let (jvm_template, game_template) = match descriptor.arguments() {
        LaunchArguments::Modern(args) => (
            evaluate_jvm_arguments(&args.jvm, platform),
            evaluate_game_arguments(&args.game, platform, request.options),
        ),
        LaunchArguments::Legacy(raw) => (legacy_jvm_arguments(), legacy_game_arguments(raw)),
    };

    let java = locate_java_binary(
        &request.layout.runtime_dir(&descriptor.runtime().component),
        platform,
    );

    let mut args = vec![path_str(&java)];
    args.extend(DIAGNOSTIC_FLAGS.iter().map(|s| s.to_string()));
    if let Some(mb) = request.options.max_memory_mb {
        args.push(format!("-Xmx{}M", mb));
    }
    args.extend(jvm_template);
    if let Some(loader) = descriptor.loader() {
        args.extend(loader.contributed_jvm_args().iter().cloned());
    }
    args.extend(request.options.extra_jvm_args.iter().cloned());
    args.push(descriptor.main_class().to_string());
    args.extend(game_template);

    let table = placeholders(request, &classpath, &natives_dir);
    let args = table.substitute_all(&args);
    debug!("Launch command has {} arguments", args.len());

    Ok(LaunchPlan {
        args,
        classpath,
        working_dir: request.profile.dir().to_path_buf(),
        natives_dir,
        platform,
    })
}

impl LaunchPlan {
    /// Shell-quoted rendering for logs and `--dry-run`.
    pub fn display_command(&self) -> String {
        self.args
            .iter()
            .map(|a| shell_escape(a))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> LauncherResult<tokio::process::Command> {
        let (program, rest) = self
            .args
            .split_first()
            .ok_or_else(|| LauncherError::JavaExecution("empty launch command".into()))?;
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(rest)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(var) = self.platform.library_path_var() {
            cmd.env(
                var,
                prepend_env_path(var, &path_str(&self.natives_dir), self.platform),
            );
        }
        Ok(cmd)
    }

    /// Spawn the game and follow its output until it exits.
    #[instrument(skip(self), fields(cwd = ?self.working_dir))]
    pub async fn run(&self) -> LauncherResult<GameExit> {
        tokio::fs::create_dir_all(&self.working_dir)
            .await
            .map_err(|e| LauncherError::io(&self.working_dir, e))?;

        info!("Launching: {}", self.display_command());
        let mut child = self
            .command()?
            .spawn()
            .map_err(|e| LauncherError::JavaExecution(format!("{}: {}", self.args[0], e)))?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, tx.clone());
        }
        drop(tx);

        let mut tail = VecDeque::with_capacity(OUTPUT_TAIL_LINES);
        while let Some(line) = rx.recv().await {
            info!("[game] {}", line);
            if tail.len() == OUTPUT_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }

        let status = child
            .wait()
            .await
            .map_err(|e| LauncherError::JavaExecution(e.to_string()))?;
        info!("Game exited with {}", status);

        Ok(GameExit {
            code: status.code(),
            success: status.success(),
            output_tail: tail.into_iter().collect(),
        })
    }
}

fn forward_lines<R>(stream: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}

fn prepend_env_path(var_name: &str, value: &str, platform: Platform) -> String {
    let separator = platform.classpath_separator();
    match std::env::var(var_name) {
        Ok(existing) if !existing.trim().is_empty() => {
            format!("{}{}{}", value, separator, existing)
        }
        _ => value.to_string(),
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assets::AssetIndex;
    use crate::core::java::RuntimeManifest;
    use crate::core::loaders::{Loader, LoaderInstallResult, LoaderSpec};
    use crate::core::version::{
        AssetIndexRef, DownloadArtifact, ReleaseType, RuntimeComponent, VersionJson,
    };

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"jar").unwrap();
    }

    fn descriptor(manifest: serde_json::Value) -> VersionDescriptor {
        let json: VersionJson = serde_json::from_value(manifest).unwrap();
        let arguments = match (json.arguments, json.minecraft_arguments) {
            (Some(a), _) => LaunchArguments::Modern(a),
            (None, Some(raw)) => LaunchArguments::Legacy(raw),
            (None, None) => panic!("no arguments"),
        };
        VersionDescriptor {
            id: "1.20.1".into(),
            release_type: ReleaseType::Release,
            main_class: json.main_class.unwrap(),
            asset_index: AssetIndexRef {
                id: "5".into(),
                url: "http://x/5.json".into(),
                index: AssetIndex::parse(r#"{"objects":{}}"#).unwrap(),
                raw: String::new(),
            },
            libraries: json.libraries,
            client_jar: DownloadArtifact {
                sha1: "0".repeat(40),
                size: 1,
                url: "http://x/client.jar".into(),
            },
            runtime: RuntimeComponent {
                component: "java-runtime-gamma".into(),
                manifest: serde_json::from_str::<RuntimeManifest>(r#"{"files":{}}"#).unwrap(),
            },
            arguments,
            raw_manifest: String::new(),
            loader: None,
        }
    }

    fn library(path: &str, os: Option<&str>) -> serde_json::Value {
        let segments: Vec<&str> = path.split('/').collect();
        let n = segments.len();
        let mut lib = serde_json::json!({
            "name": format!("org.lwjgl:{}:{}", segments[n - 3], segments[n - 2]),
            "downloads": {"artifact": {"path": path, "sha1": "0", "size": 1, "url": "http://x"}}
        });
        if let Some(os) = os {
            lib["rules"] = serde_json::json!([{"action": "allow", "os": {"name": os}}]);
        }
        lib
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        layout: DataLayout,
        settings: LauncherSettings,
        profile: Profile,
        player: PlayerInfo,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        for rel in [
            "org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1.jar",
            "org/lwjgl/lwjgl/3.3.2/lwjgl-3.3.2.jar",
            "org/lwjgl/lwjgl-glfw/3.3.1/lwjgl-glfw-3.3.1.jar",
        ] {
            touch(&layout.libraries_dir().join(rel));
        }
        touch(&layout.client_jar("1.20.1"));
        let profile = Profile::new("main", layout.profiles_dir().join("main"));
        Fixture {
            _dir: dir,
            layout,
            settings: LauncherSettings::default(),
            profile,
            player: PlayerInfo::offline("Alex"),
        }
    }

    fn modern_manifest(libraries: Vec<serde_json::Value>) -> serde_json::Value {
        serde_json::json!({
            "mainClass": "net.minecraft.client.main.Main",
            "libraries": libraries,
            "arguments": {
                "jvm": [
                    {"rules": [{"action": "allow", "os": {"name": "osx"}}], "value": ["-XstartOnFirstThread"]},
                    "-Djava.library.path=${natives_directory}",
                    "-cp",
                    "${classpath}"
                ],
                "game": [
                    "--username", "${auth_player_name}",
                    "--gameDir", "${game_directory}",
                    "--assetIndex", "${assets_index_name}",
                    {"rules": [{"action": "allow", "features": {"has_custom_resolution": true}}],
                     "value": ["--width", "${resolution_width}", "--height", "${resolution_height}"]}
                ]
            }
        })
    }

    #[test]
    fn modern_plan_orders_and_substitutes() {
        let fx = fixture();
        let desc = descriptor(modern_manifest(vec![
            library("org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1.jar", None),
            library("org/lwjgl/lwjgl/3.3.2/lwjgl-3.3.2.jar", None),
            library("org/lwjgl/lwjgl-glfw/3.3.1/lwjgl-glfw-3.3.1.jar", Some("osx")),
        ]));
        let options = LaunchOptions {
            max_memory_mb: Some(2048),
            ..Default::default()
        };
        let request = LaunchRequest {
            descriptor: &desc,
            layout: &fx.layout,
            settings: &fx.settings,
            options: &options,
            profile: &fx.profile,
            player: &fx.player,
            platform: Platform::Linux,
        };
        let plan = build_launch_plan(&request).unwrap();

        assert!(plan.args[0].ends_with("java"));
        assert_eq!(&plan.args[1..3], &DIAGNOSTIC_FLAGS.map(String::from)[..]);
        assert_eq!(plan.args[3], "-Xmx2048M");
        assert!(!plan.args.iter().any(|a| a == "-XstartOnFirstThread"));
        assert!(!plan.args.iter().any(|a| a == "--width"));

        assert!(plan.classpath.contains("lwjgl-3.3.2.jar"));
        assert!(!plan.classpath.contains("lwjgl-3.3.1.jar"));
        assert!(!plan.classpath.contains("lwjgl-glfw"));
        assert!(plan.classpath.ends_with("1.20.1.jar"));

        let main = plan
            .args
            .iter()
            .position(|a| a == "net.minecraft.client.main.Main")
            .unwrap();
        assert_eq!(plan.args[main - 1], plan.classpath);
        assert_eq!(plan.args[main + 2], "Alex");
        assert_eq!(plan.args[main + 4], fx.profile.dir().to_string_lossy());
        assert_eq!(plan.args[main + 6], "5");
        assert!(!plan.args.iter().any(|a| a.contains("${")));
    }

    #[test]
    fn custom_resolution_enables_gated_game_arguments() {
        let fx = fixture();
        let desc = descriptor(modern_manifest(vec![]));
        let options = LaunchOptions {
            resolution: Some((1280, 720)),
            ..Default::default()
        };
        let request = LaunchRequest {
            descriptor: &desc,
            layout: &fx.layout,
            settings: &fx.settings,
            options: &options,
            profile: &fx.profile,
            player: &fx.player,
            platform: Platform::Osx,
        };
        let plan = build_launch_plan(&request).unwrap();
        let tail: Vec<&str> = plan.args.iter().rev().take(4).rev().map(String::as_str).collect();
        assert_eq!(tail, ["--width", "1280", "--height", "720"]);
        assert!(plan.args.iter().any(|a| a == "-XstartOnFirstThread"));
    }

    #[test]
    fn loader_contributions_are_applied() {
        let fx = fixture();
        let loader_jar = fx
            .layout
            .libraries_dir()
            .join("net/fabricmc/fabric-loader/0.15.11/fabric-loader-0.15.11.jar");
        touch(&loader_jar);

        let mut desc = descriptor(modern_manifest(vec![]));
        desc.loader = Some(Loader::new(LoaderSpec::fabric("0.15.11")));
        desc.apply_loader_install(LoaderInstallResult {
            main_class: Some("net.fabricmc.loader.impl.launch.knot.KnotClient".into()),
            jvm_args: vec!["-DFabricMcEmu= net.minecraft.client.main.Main ".into()],
            libraries: vec![Library::new("fabric-loader", "0.15.11", &loader_jar)],
        });

        let options = LaunchOptions {
            extra_jvm_args: vec!["-XX:+UseG1GC".into()],
            ..Default::default()
        };
        let request = LaunchRequest {
            descriptor: &desc,
            layout: &fx.layout,
            settings: &fx.settings,
            options: &options,
            profile: &fx.profile,
            player: &fx.player,
            platform: Platform::Linux,
        };
        let plan = build_launch_plan(&request).unwrap();
        let main = plan
            .args
            .iter()
            .position(|a| a == "net.fabricmc.loader.impl.launch.knot.KnotClient")
            .unwrap();
        assert_eq!(plan.args[main - 2], "-DFabricMcEmu= net.minecraft.client.main.Main ");
        assert_eq!(plan.args[main - 1], "-XX:+UseG1GC");
        assert!(plan.classpath.starts_with(&*loader_jar.to_string_lossy()));
    }

    #[test]
    fn legacy_arguments_keep_paths_with_spaces_intact() {
        let fx = fixture();
        let desc = descriptor(serde_json::json!({
            "mainClass": "net.minecraft.client.Minecraft",
            "minecraftArguments": "${auth_player_name} ${auth_session} --gameDir ${game_directory}"
        }));
        let profile = Profile::new("with space", fx.layout.profiles_dir().join("with space"));
        let options = LaunchOptions::default();
        let request = LaunchRequest {
            descriptor: &desc,
            layout: &fx.layout,
            settings: &fx.settings,
            options: &options,
            profile: &profile,
            player: &fx.player,
            platform: Platform::Linux,
        };
        let plan = build_launch_plan(&request).unwrap();
        let n = plan.args.len();
        assert_eq!(plan.args[n - 1], profile.dir().to_string_lossy());
        assert_eq!(plan.args[n - 2], "--gameDir");
        assert_eq!(plan.args[n - 3], "0");
        assert_eq!(plan.args[n - 4], "Alex");
        assert!(plan.args.iter().any(|a| a == "-cp"));
    }

    #[test]
    fn missing_library_fails_plan() {
        let fx = fixture();
        let desc = descriptor(modern_manifest(vec![library(
            "org/lwjgl/lwjgl-stb/3.3.1/lwjgl-stb-3.3.1.jar",
            None,
        )]));
        let options = LaunchOptions::default();
        let request = LaunchRequest {
            descriptor: &desc,
            layout: &fx.layout,
            settings: &fx.settings,
            options: &options,
            profile: &fx.profile,
            player: &fx.player,
            platform: Platform::Linux,
        };
        assert!(matches!(
            build_launch_plan(&request),
            Err(LauncherError::MissingLibrary(_))
        ));
    }

    #[test]
    fn shell_escape_quotes_spaces() {
        assert_eq!(shell_escape("-Xmx2G"), "-Xmx2G");
        assert_eq!(shell_escape("/a b/c"), "\"/a b/c\"");
        assert_eq!(shell_escape(""), "\"\"");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_collects_output_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let plan = LaunchPlan {
            args: vec![
                "sh".into(),
                "-c".into(),
                "echo out; echo err 1>&2; exit 3".into(),
            ],
            classpath: String::new(),
            working_dir: dir.path().join("game"),
            natives_dir: dir.path().join("natives"),
            platform: Platform::Linux,
        };
        let exit = plan.run().await.unwrap();
        assert_eq!(exit.code, Some(3));
        assert!(!exit.success);
        let mut lines = exit.output_tail.clone();
        lines.sort();
        assert_eq!(lines, vec!["err", "out"]);
    }
}
