//! Persistence module
//!
//! Keyboard settings save/load using serde and JSON.

pub mod settings;

pub use settings::{
    default_settings_path, load_from_file, save_to_file, KeyboardSettings, SettingsError,
    SETTINGS_VERSION,
};
