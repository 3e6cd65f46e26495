mod app_state;
mod paths;
mod settings;

pub use app_state::LauncherState;
pub use paths::{default_data_dir, DataLayout};
pub use settings::{LauncherSettings, MetaEndpoints, SETTINGS_FILE};
