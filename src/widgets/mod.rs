//! Widgets module
//!
//! egui hosting for the chromatic keyboard.

pub mod keyboard_view;

pub use keyboard_view::{chroma_keyboard, keycode_for, EguiPainterTarget};
