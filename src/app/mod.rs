//! Application module
//!
//! Contains the demo egui application and its theme.

pub mod keyboard_app;
pub mod theme;

pub use keyboard_app::KeyboardApp;
