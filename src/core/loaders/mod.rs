pub mod context;
pub mod fabric;
pub mod installer;

pub use context::InstallContext;
pub use fabric::FabricInstaller;
pub use installer::{Installer, Loader, LoaderInstallResult, LoaderInstaller, LoaderKind, LoaderSpec};
