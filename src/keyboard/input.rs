//! Input events and per-pointer state.

use std::collections::BTreeSet;

use egui::{Pos2, Vec2};

use super::geometry::Orientation;
use super::layout::Keycode;
use super::tracker::PointerId;
use super::Note;

/// A raw event delivered by the host, in local widget coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    PointerEnter { id: PointerId, pos: Pos2 },
    PointerMove { id: PointerId, pos: Pos2 },
    PointerDown { id: PointerId, pos: Pos2 },
    PointerUp { id: PointerId, pos: Pos2 },
    PointerExit { id: PointerId },
    /// Wheel movement in host wheel units.
    Wheel { delta: Vec2 },
    KeyDown(Keycode),
    KeyUp(Keycode),
    FocusGained,
    FocusLost,
}

/// What one pointer is doing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointerTrack {
    /// Note under the pointer.
    pub hovered: Option<Note>,
    /// Note the pointer is holding down.
    pub held: Option<Note>,
    /// Whether the pointer is in contact / has a button down.
    pub pressed: bool,
}

/// Parts of the keyboard that need painting again.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Repaint {
    pub all: bool,
    pub notes: BTreeSet<Note>,
}

impl Repaint {
    pub fn note(&mut self, note: Option<Note>) {
        if let Some(note) = note {
            self.notes.insert(note);
        }
    }

    pub fn everything(&mut self) {
        self.all = true;
    }

    pub fn is_empty(&self) -> bool {
        !self.all && self.notes.is_empty()
    }
}

/// Wheel movement along the note axis, positive towards lower notes.
///
/// Horizontal keyboards prefer a sideways wheel and fall back to the
/// inverted vertical wheel. The two vertical orientations run in opposite
/// directions, so they read the vertical wheel with opposite signs.
pub fn wheel_amount(orientation: Orientation, delta: Vec2) -> f32 {
    match orientation {
        Orientation::Horizontal if delta.x != 0.0 => delta.x,
        Orientation::VerticalFacingLeft => delta.y,
        Orientation::Horizontal | Orientation::VerticalFacingRight => -delta.y,
    }
}
