// ─── Commands ───
// Embedding surface of the engine. Each command takes the shared
// `LauncherState` and a progress sink and returns a `LauncherResult`.

use serde::Serialize;
use tracing::info;

use crate::core::auth::PlayerInfo;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::install::VersionInstaller;
use crate::core::launch::{build_launch_plan, GameExit, LaunchOptions, LaunchPlan, LaunchRequest};
use crate::core::loaders::LoaderSpec;
use crate::core::profile::{BundleIndex, ContentTreeSync, Profile, RemoteProfile};
use crate::core::progress::SharedProgress;
use crate::core::state::LauncherState;
use crate::core::version::{VersionDescriptor, VersionIndex, VersionResolver};

#[derive(Debug, Clone, Serialize)]
pub struct VersionSummary {
    pub id: String,
    pub version_type: String,
    pub release_time: Option<String>,
}

/// Versions listed by the configured version index.
pub async fn list_versions(state: &LauncherState) -> LauncherResult<Vec<VersionSummary>> {
    let index = VersionIndex::fetch(
        &state.http_client,
        &state.settings.endpoints.version_index_url,
    )
    .await?;

    Ok(index
        .versions
        .into_iter()
        .map(|entry| VersionSummary {
            id: entry.id,
            version_type: entry.version_type,
            release_time: entry.release_time,
        })
        .collect())
}

/// Run the metadata chain for `version_id`.
pub async fn resolve(
    state: &LauncherState,
    version_id: &str,
    loader: Option<LoaderSpec>,
    progress: SharedProgress,
) -> LauncherResult<VersionDescriptor> {
    VersionResolver::new(&state.http_client, &state.settings.endpoints, state.platform)
        .resolve(version_id, loader, progress)
        .await
}

/// Download everything `descriptor` needs and run its loader, if any.
pub async fn install(
    state: &LauncherState,
    descriptor: &mut VersionDescriptor,
    progress: SharedProgress,
) -> LauncherResult<()> {
    VersionInstaller::new(
        &state.layout,
        &state.downloader,
        &state.settings.endpoints,
        state.scheduler(),
        state.platform,
    )
    .install(descriptor, progress)
    .await
}

/// Render the launch command without starting anything.
pub fn build_launch_command(
    state: &LauncherState,
    descriptor: &VersionDescriptor,
    options: &LaunchOptions,
    profile: &Profile,
    player: &PlayerInfo,
) -> LauncherResult<LaunchPlan> {
    build_launch_plan(&LaunchRequest {
        descriptor,
        layout: &state.layout,
        settings: &state.settings,
        options,
        profile,
        player,
        platform: state.platform,
    })
}

/// Launch `descriptor` inside profile `profile_id` and wait for the game to
/// exit. The profile is created on first use.
pub async fn launch(
    state: &mut LauncherState,
    descriptor: &VersionDescriptor,
    options: &LaunchOptions,
    profile_id: &str,
    player: &PlayerInfo,
) -> LauncherResult<GameExit> {
    let profile = state.profiles.get_or_create(profile_id).await?;
    let plan = build_launch_command(state, descriptor, options, &profile, player)?;
    let exit = plan.run().await?;
    if !exit.success {
        let tail = exit.output_tail.join("\n");
        return Err(LauncherError::JavaExecution(format!(
            "game exited with {:?}\n{}",
            exit.code, tail
        )));
    }
    Ok(exit)
}

/// Materialize the content tree at `manifest_url` into profile `profile_id`.
pub async fn sync_content_tree(
    state: &mut LauncherState,
    manifest_url: &str,
    profile_id: &str,
    progress: SharedProgress,
) -> LauncherResult<Profile> {
    let syncer = ContentTreeSync::new(&state.downloader, state.scheduler(), state.layout.temp_dir());
    let profile = syncer
        .sync(manifest_url, profile_id, &mut state.profiles, progress)
        .await?;
    info!("Profile '{}' ready at {:?}", profile.id, profile.path);
    Ok(profile)
}

/// Profiles offered by the bundle index at `bundle_url` to `player_uuid`.
pub async fn list_remote_profiles(
    state: &LauncherState,
    bundle_url: &str,
    player_uuid: Option<&str>,
) -> LauncherResult<Vec<RemoteProfile>> {
    BundleIndex::fetch(&state.http_client, bundle_url)
        .await?
        .profiles_for(&state.http_client, bundle_url, player_uuid)
        .await
}

/// A synced profile together with the installed version it runs on.
#[derive(Debug, Clone)]
pub struct ProvisionedProfile {
    pub profile: Profile,
    pub descriptor: VersionDescriptor,
}

/// Sync a bundle profile, then resolve and install the version and loader
/// its manifest names.
pub async fn provision_remote_profile(
    state: &mut LauncherState,
    remote: &RemoteProfile,
    progress: SharedProgress,
) -> LauncherResult<ProvisionedProfile> {
    let profile = sync_content_tree(state, &remote.manifest_url, &remote.name, progress.clone()).await?;
    let target = profile.target.clone().unwrap_or_else(|| remote.target.clone());

    let mut descriptor = resolve(state, &target.version, target.loader, progress.clone()).await?;
    install(state, &mut descriptor, progress).await?;
    info!(
        "Profile '{}' provisioned with {}",
        profile.id,
        descriptor.id()
    );
    Ok(ProvisionedProfile {
        profile,
        descriptor,
    })
}

pub fn list_profiles(state: &LauncherState) -> Vec<Profile> {
    state.profiles.list().into_iter().cloned().collect()
}
