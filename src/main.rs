use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;

use lodestone::commands;
use lodestone::core::auth::PlayerInfo;
use lodestone::core::error::{LauncherError, LauncherResult};
use lodestone::core::launch::LaunchOptions;
use lodestone::core::loaders::LoaderSpec;
use lodestone::core::progress::log_sink;
use lodestone::core::state::{default_data_dir, LauncherSettings, LauncherState};

#[derive(Debug, Parser)]
#[command(name = "lodestone", version, about = "Provision and launch Minecraft installations")]
struct Cli {
    /// Data directory holding assets, libraries, runtimes and profiles.
    #[arg(long, global = true, env = "LODESTONE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Download workers per stage, overriding the saved settings.
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List versions from the version index.
    Versions {
        #[arg(long)]
        snapshots: bool,
    },
    /// Resolve and install a version.
    Install {
        version: String,
        /// Fabric loader version to install on top.
        #[arg(long)]
        fabric: Option<String>,
    },
    /// Install (if needed) and launch a version inside a profile. Without a
    /// version, the one recorded by the profile's last sync is used.
    Launch {
        version: Option<String>,
        #[arg(long)]
        profile: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        fabric: Option<String>,
        #[arg(long, requires = "height")]
        width: Option<u32>,
        #[arg(long, requires = "width")]
        height: Option<u32>,
        #[arg(long)]
        demo: bool,
        /// Maximum heap in MiB.
        #[arg(long)]
        memory: Option<u32>,
        /// Print the command instead of starting the game.
        #[arg(long)]
        dry_run: bool,
    },
    /// Sync a profile from a content-tree manifest.
    Sync { manifest_url: String, profile_id: String },
    /// List the profiles offered by a bundle index.
    Bundle {
        bundle_url: String,
        #[arg(long)]
        uuid: Option<String>,
        /// Sync the named profile and install the version it targets.
        #[arg(long)]
        install: Option<String>,
    },
    /// List local profiles.
    Profiles,
}

#[tokio::main]
async fn main() -> ExitCode {
    lodestone::init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn open_state(cli: &Cli) -> LauncherResult<LauncherState> {
    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    let mut settings = LauncherSettings::load(&data_dir);
    if let Some(workers) = cli.workers {
        settings.worker_count = workers.max(1);
    }
    LauncherState::with_settings(data_dir, settings).await
}

async fn run(cli: Cli) -> LauncherResult<()> {
    let mut state = open_state(&cli).await?;
    let progress = log_sink();

    match cli.command {
        Command::Versions { snapshots } => {
            for version in commands::list_versions(&state).await? {
                if snapshots || version.version_type == "release" {
                    println!("{}\t{}", version.id, version.version_type);
                }
            }
        }
        Command::Install { version, fabric } => {
            let loader = fabric.map(LoaderSpec::fabric);
            let mut descriptor =
                commands::resolve(&state, &version, loader, progress.clone()).await?;
            commands::install(&state, &mut descriptor, progress).await?;
            println!("Installed {}", descriptor.id());
        }
        Command::Launch {
            version,
            profile,
            username,
            fabric,
            width,
            height,
            demo,
            memory,
            dry_run,
        } => {
            let (version, loader) = match version {
                Some(version) => (version, fabric.map(LoaderSpec::fabric)),
                None => {
                    let target = state
                        .profiles
                        .get(&profile)
                        .and_then(|p| p.target.clone())
                        .ok_or_else(|| LauncherError::ProfileNotFound(profile.clone()))?;
                    let loader = fabric.map(LoaderSpec::fabric).or(target.loader);
                    (target.version, loader)
                }
            };
            let mut descriptor =
                commands::resolve(&state, &version, loader, progress.clone()).await?;
            commands::install(&state, &mut descriptor, progress).await?;

            let options = LaunchOptions {
                resolution: width.zip(height),
                demo,
                max_memory_mb: memory,
                extra_jvm_args: Vec::new(),
            };
            let player = PlayerInfo::offline(&username).sanitized();

            if dry_run {
                let profile = state.profiles.get_or_create(&profile).await?;
                let plan =
                    commands::build_launch_command(&state, &descriptor, &options, &profile, &player)?;
                println!("{}", plan.display_command());
            } else {
                let exit =
                    commands::launch(&mut state, &descriptor, &options, &profile, &player).await?;
                println!("Game exited with {:?}", exit.code);
            }
        }
        Command::Sync {
            manifest_url,
            profile_id,
        } => {
            let profile =
                commands::sync_content_tree(&mut state, &manifest_url, &profile_id, progress)
                    .await?;
            println!("{}\t{}", profile.id, profile.path.display());
        }
        Command::Bundle {
            bundle_url,
            uuid,
            install,
        } => {
            let remotes = commands::list_remote_profiles(&state, &bundle_url, uuid.as_deref()).await?;
            match install {
                Some(name) => {
                    let remote = remotes
                        .iter()
                        .find(|r| r.name == name)
                        .ok_or_else(|| LauncherError::ProfileNotFound(name.clone()))?;
                    let provisioned =
                        commands::provision_remote_profile(&mut state, remote, progress).await?;
                    println!(
                        "{}\t{}\t{}",
                        provisioned.profile.id,
                        provisioned.descriptor.id(),
                        provisioned.profile.path.display()
                    );
                }
                None => {
                    for remote in remotes {
                        let loader = remote
                            .target
                            .loader
                            .map(|l| format!("{} {}", l.kind, l.version))
                            .unwrap_or_else(|| "vanilla".to_string());
                        println!(
                            "{}\t{}\t{}\t{}",
                            remote.name, remote.target.version, loader, remote.manifest_url
                        );
                    }
                }
            }
        }
        Command::Profiles => {
            for profile in commands::list_profiles(&state) {
                let icon = profile
                    .icon_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                println!("{}\t{}\t{}", profile.id, profile.description, icon);
            }
        }
    }
    Ok(())
}
