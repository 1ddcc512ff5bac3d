//! Note geometry.
//!
//! Notes are laid out along one axis as equal-width strips, grouped into
//! octaves of a configurable size. Everything here works in a "note axis"
//! coordinate system: `along` runs from the lowest to the highest note and
//! `across` runs from the key root to the key tip. [`Orientation`] maps
//! local widget coordinates into that system in exactly one place,
//! [`KeyGeometry::to_note_axis`].

use std::ops::Sub;

use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

use super::{Note, MAX_NOTE};

/// Direction the keyboard is drawn in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// Low notes on the left, keys pointing down.
    #[default]
    Horizontal,
    /// Low notes at the top, keys pointing left.
    VerticalFacingLeft,
    /// Low notes at the bottom, keys pointing right.
    VerticalFacingRight,
}

impl Orientation {
    /// All orientations, in menu order.
    pub const ALL: [Orientation; 3] = [
        Orientation::Horizontal,
        Orientation::VerticalFacingLeft,
        Orientation::VerticalFacingRight,
    ];

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Orientation::Horizontal => "Horizontal",
            Orientation::VerticalFacingLeft => "Vertical (left)",
            Orientation::VerticalFacingRight => "Vertical (right)",
        }
    }

    /// Whether notes run along the x axis.
    pub fn is_horizontal(&self) -> bool {
        matches!(self, Orientation::Horizontal)
    }
}

/// Inclusive range of notes the keyboard shows and accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteRange {
    /// Lowest note.
    pub start: Note,
    /// Highest note.
    pub end: Note,
}

impl NoteRange {
    /// Every MIDI note.
    pub const FULL: NoteRange = NoteRange {
        start: 0,
        end: MAX_NOTE,
    };

    /// Create a range, clamping both ends to valid notes.
    ///
    /// `start <= end` is a precondition; release builds swap nothing and
    /// collapse an inverted range onto `start`.
    pub fn new(start: Note, end: Note) -> Self {
        debug_assert!(start <= end, "note range start {start} > end {end}");
        let start = start.min(MAX_NOTE);
        let end = end.clamp(start, MAX_NOTE);
        Self { start, end }
    }

    /// Whether a note lies in the range.
    pub fn contains(&self, note: Note) -> bool {
        self.start <= note && note <= self.end
    }

    /// Iterate over the notes of the range.
    pub fn notes(&self) -> impl DoubleEndedIterator<Item = Note> {
        self.start..=self.end
    }

    /// Number of notes in the range.
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    /// Ranges always hold at least one note.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for NoteRange {
    fn default() -> Self {
        Self::FULL
    }
}

/// Half-open pixel interval `[start, end)` along the note axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeySpan {
    /// First pixel covered.
    pub start: f32,
    /// One past the last pixel covered.
    pub end: f32,
}

impl KeySpan {
    /// Length of the span.
    pub fn length(&self) -> f32 {
        self.end - self.start
    }

    /// Centre of the span.
    pub fn midpoint(&self) -> f32 {
        (self.start + self.end) * 0.5
    }

    /// Half-open containment test.
    pub fn contains(&self, position: f32) -> bool {
        self.start <= position && position < self.end
    }
}

impl Sub<f32> for KeySpan {
    type Output = KeySpan;

    fn sub(self, offset: f32) -> KeySpan {
        KeySpan {
            start: self.start - offset,
            end: self.end - offset,
        }
    }
}

/// Absolute pixel interval of a note, counted from note 0.
///
/// Octaves are fixed-width bands divided evenly between their notes.
pub fn note_interval(note: Note, key_width: f32, octave_size: u32) -> KeySpan {
    let octave_size = octave_size.max(1);
    let octave = note as u32 / octave_size;
    let step = note as u32 % octave_size;
    let start = (octave * octave_size) as f32 * key_width + step as f32 * key_width;
    KeySpan {
        start,
        end: start + key_width,
    }
}

/// Which end of the keyboard a scroll button moves towards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScrollDirection {
    /// Towards lower notes.
    Down,
    /// Towards higher notes.
    Up,
}

/// Where the scroll buttons currently sit, in local coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollButtons {
    /// Button scrolling towards lower notes, if shown.
    pub down: Option<Rect>,
    /// Button scrolling towards higher notes, if shown.
    pub up: Option<Rect>,
}

impl ScrollButtons {
    /// Button under a local position.
    pub fn hit(&self, pos: Pos2) -> Option<ScrollDirection> {
        if self.down.is_some_and(|r| r.contains(pos)) {
            Some(ScrollDirection::Down)
        } else if self.up.is_some_and(|r| r.contains(pos)) {
            Some(ScrollDirection::Up)
        } else {
            None
        }
    }
}

/// Default width of a note strip in pixels.
pub const DEFAULT_KEY_WIDTH: f32 = 16.0;
/// Default scroll button width in pixels.
pub const DEFAULT_SCROLL_BUTTON_WIDTH: f32 = 12.0;
/// Default number of notes per octave.
pub const DEFAULT_OCTAVE_SIZE: u32 = 12;
/// Default lowest visible note before the first layout pass.
pub const DEFAULT_FIRST_VISIBLE_NOTE: f32 = 48.0;

/// Layout state of the keyboard: range, sizes, orientation and scroll window.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyGeometry {
    range: NoteRange,
    key_width: f32,
    octave_size: u32,
    orientation: Orientation,
    size: Vec2,
    can_scroll: bool,
    scroll_button_width: f32,
    first_visible_note: f32,
    x_offset: f32,
    scroll_buttons: ScrollButtons,
}

impl Default for KeyGeometry {
    fn default() -> Self {
        Self::new(Orientation::default())
    }
}

impl KeyGeometry {
    /// Create geometry for the full note range with default sizes.
    pub fn new(orientation: Orientation) -> Self {
        Self {
            range: NoteRange::FULL,
            key_width: DEFAULT_KEY_WIDTH,
            octave_size: DEFAULT_OCTAVE_SIZE,
            orientation,
            size: Vec2::ZERO,
            can_scroll: true,
            scroll_button_width: DEFAULT_SCROLL_BUTTON_WIDTH,
            first_visible_note: DEFAULT_FIRST_VISIBLE_NOTE,
            x_offset: 0.0,
            scroll_buttons: ScrollButtons::default(),
        }
    }

    pub fn range(&self) -> NoteRange {
        self.range
    }

    pub fn key_width(&self) -> f32 {
        self.key_width
    }

    pub fn octave_size(&self) -> u32 {
        self.octave_size
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn can_scroll(&self) -> bool {
        self.can_scroll
    }

    pub fn scroll_button_width(&self) -> f32 {
        self.scroll_button_width
    }

    /// Lowest visible note, possibly fractional.
    pub fn first_visible_note(&self) -> f32 {
        self.first_visible_note
    }

    /// Lowest visible note, rounded down.
    pub fn lowest_visible_note(&self) -> Note {
        self.first_visible_note as Note
    }

    /// Scroll offset in pixels.
    pub fn x_offset(&self) -> f32 {
        self.x_offset
    }

    pub fn scroll_buttons(&self) -> ScrollButtons {
        self.scroll_buttons
    }

    // Setters return whether the whole-note scroll position moved while
    // re-laying out.

    pub fn set_range(&mut self, range: NoteRange) -> bool {
        if self.range == range {
            return false;
        }
        self.range = range;
        let before = self.first_visible_note as i32;
        self.first_visible_note = self
            .first_visible_note
            .clamp(range.start as f32, range.end as f32);
        let moved = self.first_visible_note as i32 != before;
        self.relayout() || moved
    }

    pub fn set_key_width(&mut self, key_width: f32) -> bool {
        debug_assert!(key_width > 0.0, "key width must be positive");
        let key_width = key_width.max(1.0);
        if self.key_width == key_width {
            return false;
        }
        self.key_width = key_width;
        self.relayout()
    }

    pub fn set_octave_size(&mut self, octave_size: u32) -> bool {
        debug_assert!(octave_size > 0, "octave size must be positive");
        let octave_size = octave_size.max(1);
        if self.octave_size == octave_size {
            return false;
        }
        self.octave_size = octave_size;
        self.relayout()
    }

    pub fn set_orientation(&mut self, orientation: Orientation) -> bool {
        if self.orientation == orientation {
            return false;
        }
        self.orientation = orientation;
        self.relayout()
    }

    pub fn set_size(&mut self, size: Vec2) -> bool {
        if self.size == size {
            return false;
        }
        self.size = size;
        self.relayout()
    }

    pub fn set_scroll_buttons_visible(&mut self, can_scroll: bool) -> bool {
        if self.can_scroll == can_scroll {
            return false;
        }
        self.can_scroll = can_scroll;
        self.relayout()
    }

    pub fn set_scroll_button_width(&mut self, width: f32) -> bool {
        debug_assert!(width > 0.0, "scroll button width must be positive");
        let width = width.max(1.0);
        if self.scroll_button_width == width {
            return false;
        }
        self.scroll_button_width = width;
        self.relayout()
    }

    /// Scroll so `note` is the lowest visible note, clamped into the range.
    pub fn set_first_visible_note(&mut self, note: f32) -> bool {
        let note = note.clamp(self.range.start as f32, self.range.end as f32);
        if note == self.first_visible_note {
            return false;
        }
        let moved = self.first_visible_note as i32 != note as i32;
        self.first_visible_note = note;
        self.relayout() || moved
    }

    /// Absolute interval of a note, counted from note 0.
    pub fn note_interval(&self, note: Note) -> KeySpan {
        note_interval(note, self.key_width, self.octave_size)
    }

    /// Interval of a note relative to the start of the range, ignoring scroll.
    fn unscrolled_interval(&self, note: Note) -> KeySpan {
        self.note_interval(note) - self.note_interval(self.range.start).start
    }

    /// Interval of a note as currently scrolled into view.
    pub fn visible_interval(&self, note: Note) -> KeySpan {
        self.unscrolled_interval(note) - self.x_offset
    }

    /// Length of the whole keyboard along the note axis.
    pub fn total_keyboard_length(&self) -> f32 {
        self.unscrolled_interval(self.range.end).end
    }

    /// Length of the widget along the note axis.
    pub fn axis_length(&self) -> f32 {
        if self.orientation.is_horizontal() {
            self.size.x
        } else {
            self.size.y
        }
    }

    /// Length of a key from root to tip.
    pub fn key_length(&self) -> f32 {
        if self.orientation.is_horizontal() {
            self.size.y
        } else {
            self.size.x
        }
    }

    /// Local rectangle covered by a note.
    pub fn rect_for_note(&self, note: Note) -> Rect {
        let span = self.visible_interval(note);
        let (x, w) = (span.start, span.length());
        match self.orientation {
            Orientation::Horizontal => {
                Rect::from_min_size(Pos2::new(x, 0.0), Vec2::new(w, self.size.y))
            }
            Orientation::VerticalFacingLeft => {
                Rect::from_min_size(Pos2::new(0.0, x), Vec2::new(self.size.x, w))
            }
            Orientation::VerticalFacingRight => Rect::from_min_size(
                Pos2::new(0.0, self.size.y - x - w),
                Vec2::new(self.size.x, w),
            ),
        }
    }

    /// Map a local position into `(along, across)` note-axis coordinates.
    pub fn to_note_axis(&self, pos: Pos2) -> Pos2 {
        match self.orientation {
            Orientation::Horizontal => pos,
            Orientation::VerticalFacingLeft => Pos2::new(pos.y, self.size.x - pos.x),
            Orientation::VerticalFacingRight => Pos2::new(self.size.y - pos.y, pos.x),
        }
    }

    /// Note under a local position and the normalised position along the key.
    pub fn pixel_to_note(&self, pos: Pos2) -> Option<(Note, f32)> {
        let bounds = Rect::from_min_size(Pos2::ZERO, self.size);
        if !bounds.contains(pos) {
            return None;
        }
        let axis = self.to_note_axis(pos);
        let note = self.note_at_along(axis.x)?;
        let key_length = self.key_length();
        let velocity = if key_length > 0.0 {
            (axis.y / key_length).max(0.0)
        } else {
            0.0
        };
        Some((note, velocity))
    }

    /// Note whose visible interval contains `along`.
    ///
    /// Facing right, the axis runs bottom to top, so intervals are closed at
    /// their end to keep each key's top edge inside its own rectangle.
    fn note_at_along(&self, along: f32) -> Option<Note> {
        let mirrored = self.orientation == Orientation::VerticalFacingRight;
        self.range.notes().find(|&note| {
            let span = self.visible_interval(note);
            if mirrored {
                span.start < along && along <= span.end
            } else {
                span.contains(along)
            }
        })
    }

    /// Note whose unscrolled interval contains `along`.
    fn unscrolled_note_at(&self, along: f32) -> Option<Note> {
        self.range
            .notes()
            .find(|&note| self.unscrolled_interval(note).contains(along))
    }

    /// Lowest visible note the next scroll button click moves to.
    pub fn scroll_target(&self, direction: ScrollDirection) -> Note {
        let lowest = self.lowest_visible_note() as i32;
        let size = self.octave_size as i32;
        let target = match direction {
            ScrollDirection::Down => ((lowest - 1) / size) * size,
            ScrollDirection::Up => (lowest / size + 1) * size,
        };
        target.clamp(0, MAX_NOTE as i32) as Note
    }

    /// Recompute the scroll window for the current size and settings.
    ///
    /// Returns whether the lowest visible note had to move. Calling it again
    /// without changing anything is a no-op.
    pub fn relayout(&mut self) -> bool {
        let axis = self.axis_length();
        if axis <= 0.0 || self.key_length() <= 0.0 {
            return false;
        }
        let start = self.range.start as f32;
        let before = self.first_visible_note;

        // No dead space past the last key when everything fits.
        if self.lowest_visible_note() != self.range.start && self.total_keyboard_length() <= axis {
            self.first_visible_note = start;
        }

        self.x_offset = 0.0;
        self.scroll_buttons = ScrollButtons::default();

        if self.can_scroll {
            let last_start = self
                .unscrolled_note_at(self.total_keyboard_length() - axis)
                .map(|note| note as i32 + 1);
            if let Some(last_start) = last_start {
                if self.lowest_visible_note() as i32 > last_start {
                    self.first_visible_note =
                        last_start.clamp(self.range.start as i32, self.range.end as i32) as f32;
                }
            }
            self.x_offset = self.unscrolled_interval(self.lowest_visible_note()).start;
            self.scroll_buttons = self.place_scroll_buttons(axis);
        } else {
            self.first_visible_note = start;
        }

        before as i32 != self.first_visible_note as i32
    }

    fn place_scroll_buttons(&self, axis: f32) -> ScrollButtons {
        let width = self.scroll_button_width.min(axis / 2.0);
        let bounds = Rect::from_min_size(Pos2::ZERO, self.size);
        let (low_end, high_end) = match self.orientation {
            Orientation::Horizontal => (
                Rect::from_min_max(bounds.min, Pos2::new(width, bounds.max.y)),
                Rect::from_min_max(Pos2::new(bounds.max.x - width, 0.0), bounds.max),
            ),
            Orientation::VerticalFacingLeft => (
                Rect::from_min_max(bounds.min, Pos2::new(bounds.max.x, width)),
                Rect::from_min_max(Pos2::new(0.0, bounds.max.y - width), bounds.max),
            ),
            Orientation::VerticalFacingRight => (
                Rect::from_min_max(Pos2::new(0.0, bounds.max.y - width), bounds.max),
                Rect::from_min_max(bounds.min, Pos2::new(bounds.max.x, width)),
            ),
        };
        let show_down = self.first_visible_note > self.range.start as f32;
        let show_up = self.visible_interval(self.range.end).start > axis;
        ScrollButtons {
            down: show_down.then_some(low_end),
            up: show_up.then_some(high_end),
        }
    }
}
