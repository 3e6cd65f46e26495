// ─── Lodestone Core ───
// Provisioning engine for a Minecraft installation.
//
// Architecture:
//   core/
//     version/    - version index, manifests, resolution chain
//     downloader/ - verified single-file fetch + batch scheduler
//     assets/     - asset index + object downloads
//     java/       - runtime component catalog and installer
//     maven/      - coordinates and maven-metadata.xml
//     loaders/    - loader extension point (Fabric)
//     launch/     - classpath, arguments, natives, process
//     profile/    - profile store and content-tree sync
//     state/      - data layout, settings, shared state

pub mod assets;
pub mod auth;
pub mod downloader;
pub mod error;
pub mod http;
pub mod install;
pub mod java;
pub mod launch;
pub mod loaders;
pub mod maven;
pub mod platform;
pub mod profile;
pub mod progress;
pub mod state;
pub mod version;
