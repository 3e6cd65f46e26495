pub mod runtime;

pub use runtime::{
    locate_java_binary, RuntimeCatalog, RuntimeEntry, RuntimeInstaller, RuntimeManifest,
    RUNTIME_CATALOG_URL,
};
