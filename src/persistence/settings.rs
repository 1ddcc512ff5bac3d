//! Keyboard settings serialization.
//!
//! Captures every user-facing keyboard parameter so a configured keyboard
//! can be saved to a JSON file and restored later. Restoring goes through
//! the keyboard's own setters, so out-of-range values are clamped the same
//! way as live edits.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::ALL_CHANNELS;
use crate::keyboard::geometry::{
    Orientation, DEFAULT_KEY_WIDTH, DEFAULT_OCTAVE_SIZE, DEFAULT_SCROLL_BUTTON_WIDTH,
};
use crate::keyboard::layout::Layout;
use crate::keyboard::{Note, DEFAULT_BASE_NOTE};

/// Current settings format version.
/// Increment this when making breaking changes to the format.
pub const SETTINGS_VERSION: u32 = 1;

/// Directory under the platform config dir holding our files.
const CONFIG_DIR_NAME: &str = "ChromaKeys";
/// File name of the default settings file.
const SETTINGS_FILE_NAME: &str = "keyboard.json";

/// Saved keyboard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardSettings {
    /// Settings format version for future compatibility.
    pub version: u32,
    pub layout: Layout,
    /// Note played by the bottom-left key of the grid.
    pub base_note: Note,
    /// Notes per octave.
    pub octave_size: u32,
    pub range_start: Note,
    pub range_end: Note,
    pub lowest_visible_note: Note,
    /// Width of one note strip in pixels.
    pub key_width: f32,
    pub scroll_button_width: f32,
    pub scroll_buttons_visible: bool,
    pub orientation: Orientation,
    /// Output channel (1-16).
    pub midi_channel: u8,
    /// Channels whose notes light up the keys.
    pub channels_to_display: u16,
    /// Note velocity (0.0-1.0).
    pub velocity: f32,
    /// Scale pointer velocity by where on the key it lands.
    pub use_position_velocity: bool,
}

impl Default for KeyboardSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            layout: Layout::default(),
            base_note: DEFAULT_BASE_NOTE,
            octave_size: DEFAULT_OCTAVE_SIZE,
            range_start: 0,
            range_end: 127,
            lowest_visible_note: 48,
            key_width: DEFAULT_KEY_WIDTH,
            scroll_button_width: DEFAULT_SCROLL_BUTTON_WIDTH,
            scroll_buttons_visible: true,
            orientation: Orientation::default(),
            midi_channel: 1,
            channels_to_display: ALL_CHANNELS,
            velocity: 1.0,
            use_position_velocity: true,
        }
    }
}

impl KeyboardSettings {
    /// Check if this settings version is compatible with the current format.
    pub fn is_compatible(&self) -> bool {
        self.version <= SETTINGS_VERSION
    }
}

/// Error type for settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// File I/O error.
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Incompatible settings version.
    #[error("Incompatible settings version: found {found}, expected <= {expected}")]
    IncompatibleVersion { found: u32, expected: u32 },
    /// No per-user config directory on this platform.
    #[error("No configuration directory available")]
    NoConfigDir,
}

/// Default location of the settings file in the user's config directory.
pub fn default_settings_path() -> Result<PathBuf, SettingsError> {
    let mut path = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
    path.push(CONFIG_DIR_NAME);
    path.push(SETTINGS_FILE_NAME);
    Ok(path)
}

/// Save settings to a JSON file, creating parent directories as needed.
pub fn save_to_file(settings: &KeyboardSettings, path: &Path) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json)?;
    log::info!("saved keyboard settings to {}", path.display());
    Ok(())
}

/// Load settings from a JSON file.
pub fn load_from_file(path: &Path) -> Result<KeyboardSettings, SettingsError> {
    let json = std::fs::read_to_string(path)?;
    let settings: KeyboardSettings = serde_json::from_str(&json)?;

    if !settings.is_compatible() {
        return Err(SettingsError::IncompatibleVersion {
            found: settings.version,
            expected: SETTINGS_VERSION,
        });
    }

    log::info!("loaded keyboard settings from {}", path.display());
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("chroma_keys_test_{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_default_settings() {
        let settings = KeyboardSettings::default();
        assert_eq!(settings.version, SETTINGS_VERSION);
        assert_eq!(settings.layout, Layout::Linear);
        assert_eq!(settings.octave_size, 12);
        assert_eq!(settings.midi_channel, 1);
        assert!(settings.is_compatible());
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("round_trip.json");
        let settings = KeyboardSettings {
            layout: Layout::Hexagonal,
            base_note: 52,
            octave_size: 19,
            orientation: Orientation::VerticalFacingRight,
            ..Default::default()
        };
        save_to_file(&settings, &path).unwrap();
        let loaded = load_from_file(&path).unwrap();
        assert_eq!(loaded, settings);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: KeyboardSettings =
            serde_json::from_str(r#"{ "layout": "Organ", "base_note": 60 }"#).unwrap();
        assert_eq!(settings.layout, Layout::Organ);
        assert_eq!(settings.base_note, 60);
        assert_eq!(settings.key_width, DEFAULT_KEY_WIDTH);
    }

    #[test]
    fn test_incompatible_version_rejected() {
        let path = temp_path("future.json");
        let settings = KeyboardSettings {
            version: SETTINGS_VERSION + 1,
            ..Default::default()
        };
        save_to_file(&settings, &path).unwrap();
        match load_from_file(&path) {
            Err(SettingsError::IncompatibleVersion { found, expected }) => {
                assert_eq!(found, SETTINGS_VERSION + 1);
                assert_eq!(expected, SETTINGS_VERSION);
            }
            other => panic!("Expected IncompatibleVersion, got {:?}", other),
        }
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = load_from_file(&temp_path("does_not_exist.json"));
        assert!(matches!(result, Err(SettingsError::Io(_))));
    }
}
