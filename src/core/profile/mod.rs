pub mod bundle;
pub mod manager;
pub mod model;
pub mod sync;
pub mod workspace;

pub use bundle::{BundleIndex, BundleListing, RemoteProfile};
pub use manager::ProfileStore;
pub use model::{GameTarget, Profile};
pub use sync::{
    tracked_hash, ContentTreeManifest, ContentTreeNode, ContentTreeSync, ManifestLoader, SYNC_STAGE,
};
pub use workspace::{move_contents, ScratchWorkspace};
