pub mod settings;
pub mod watcher;

pub use settings::*;
pub use watcher::SettingsWatcher;
