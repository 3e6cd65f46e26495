pub mod arguments;
pub mod classpath;
pub mod natives;
pub mod task;

pub use arguments::{LaunchOptions, Placeholders, DIAGNOSTIC_FLAGS};
pub use classpath::{build_classpath, parse_version_key, resolve_libraries, Library, CLIENT_JAR_GROUP};
pub use natives::extract_natives;
pub use task::{build_launch_plan, GameExit, LaunchPlan, LaunchRequest};
