//! Keyboard module
//!
//! The on-screen chromatic keyboard: note geometry, physical key layouts,
//! press tracking, input routing and painting. Nothing here depends on a
//! window system; `widgets::keyboard_view` hosts it inside egui.

pub mod component;
pub mod geometry;
pub mod input;
pub mod layout;
pub mod notify;
pub mod render;
pub mod style;
pub mod tracker;

pub use component::{ChromaKeyboard, POLL_HZ};
pub use geometry::{KeyGeometry, KeySpan, NoteRange, Orientation, ScrollDirection};
pub use input::{InputEvent, Repaint};
pub use layout::{build_mapping, KeyMapping, Keycode, Layout};
pub use render::{paint_keyboard, RenderTarget, TextAnchor};
pub use style::KeyboardStyle;
pub use tracker::{Cause, KeyStateTracker, PointerId};

/// MIDI note number, 0-127.
pub type Note = u8;

/// Highest MIDI note.
pub const MAX_NOTE: Note = 127;

/// Number of MIDI notes.
pub const NOTE_COUNT: usize = 128;

/// Note played by the bottom-left grid key until configured otherwise.
pub const DEFAULT_BASE_NOTE: Note = 48;
