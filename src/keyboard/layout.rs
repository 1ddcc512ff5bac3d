//! Computer keyboard layouts.
//!
//! Maps the fixed 4 x 10 grid of physical keys onto note numbers. Each
//! layout is a rule turning a (row, column) cell into an offset from the
//! base note, in the spirit of fretted and isomorphic instruments.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::geometry::NoteRange;
use super::Note;

/// Number of rows in the physical key grid.
pub const GRID_ROWS: usize = 4;
/// Number of columns in the physical key grid.
pub const GRID_COLUMNS: usize = 10;

/// The physical key grid, bottom letter row first.
pub const KEY_GRID: &str = "zxcvbnm,./asdfghjkl;qwertyuiop1234567890";

/// Offsets of the white keys inside one octave (C D E F G A B).
const ORGAN_WHITE_KEYS: [Option<i32>; 7] = [
    Some(0),
    Some(2),
    Some(4),
    Some(5),
    Some(7),
    Some(9),
    Some(11),
];
/// Offsets of the black keys; `None` marks the gaps after E and B.
const ORGAN_BLACK_KEYS: [Option<i32>; 7] =
    [None, Some(1), Some(3), None, Some(6), Some(8), Some(10)];
/// White keys per organ octave.
const ORGAN_WHITE_KEYS_PER_OCTAVE: i32 = 7;
/// Semitones per organ octave.
const ORGAN_SEMITONES: i32 = 12;

/// A physical key, as delivered by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Keycode {
    /// A printable key, lower-cased.
    Char(char),
    /// Escape: releases every sounding note.
    Escape,
    /// Arrow up: shifts the base note up by one.
    Up,
    /// Arrow down: shifts the base note down by one.
    Down,
    /// Page up: shifts the base note up by one octave.
    PageUp,
    /// Page down: shifts the base note down by one octave.
    PageDown,
    /// Any key the keyboard has no use for.
    Other(u32),
}

/// Rule used to lay notes out over the key grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layout {
    /// Rows continue each other: ten notes per row.
    #[default]
    Linear,
    /// Semitones along a row, fourths between rows.
    Guitar,
    /// Piano-style white and black key rows.
    Organ,
    /// Whole tones along a row, semitones between rows.
    Harpejji,
    /// Major thirds along a row, minor thirds between rows.
    Hexagonal,
}

impl Layout {
    /// All layouts, in menu order.
    pub const ALL: [Layout; 5] = [
        Layout::Linear,
        Layout::Guitar,
        Layout::Organ,
        Layout::Harpejji,
        Layout::Hexagonal,
    ];

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Layout::Linear => "Linear",
            Layout::Guitar => "Guitar",
            Layout::Organ => "Organ",
            Layout::Harpejji => "Harpejji",
            Layout::Hexagonal => "Hexagonal",
        }
    }

    /// Column and row step sizes for the isomorphic layouts.
    /// Returns `None` for [`Layout::Organ`], which is not isomorphic.
    pub fn steps(&self) -> Option<(i32, i32)> {
        match self {
            Layout::Linear => Some((1, 10)),
            Layout::Guitar => Some((1, 5)),
            Layout::Organ => None,
            Layout::Harpejji => Some((2, 1)),
            Layout::Hexagonal => Some((4, 3)),
        }
    }

    /// Offset from the base note for a grid cell, or `None` for a dead cell.
    pub fn offset(&self, row: usize, col: usize) -> Option<i32> {
        let (row, col) = (row as i32, col as i32);
        match self.steps() {
            Some((x_step, y_step)) => Some(col * x_step + row * y_step),
            None => {
                // Row pairs continue each other, so the upper pair starts
                // ten white keys further along.
                let index = (row / 2) * GRID_COLUMNS as i32 + col;
                let keys = if row % 2 == 0 {
                    &ORGAN_WHITE_KEYS
                } else {
                    &ORGAN_BLACK_KEYS
                };
                let offset = keys[(index % ORGAN_WHITE_KEYS_PER_OCTAVE) as usize]?;
                Some(offset + (index / ORGAN_WHITE_KEYS_PER_OCTAVE) * ORGAN_SEMITONES)
            }
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keycode for a cell of [`KEY_GRID`].
pub fn grid_keycode(row: usize, col: usize) -> Option<Keycode> {
    if row >= GRID_ROWS || col >= GRID_COLUMNS {
        return None;
    }
    KEY_GRID.chars().nth(row * GRID_COLUMNS + col).map(Keycode::Char)
}

/// Keycode to note table for one layout and base note.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyMapping {
    notes: HashMap<Keycode, Note>,
}

impl KeyMapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Note played by a key, if it is mapped.
    pub fn note_for(&self, keycode: Keycode) -> Option<Note> {
        self.notes.get(&keycode).copied()
    }

    /// Map a key to a note. Notes outside `range` unmap the key instead.
    pub fn map(&mut self, keycode: Keycode, note: i32, range: NoteRange) {
        match Note::try_from(note) {
            Ok(note) if range.contains(note) => {
                self.notes.insert(keycode, note);
            }
            _ => self.unmap(keycode),
        }
    }

    /// Remove a key from the mapping.
    pub fn unmap(&mut self, keycode: Keycode) {
        self.notes.remove(&keycode);
    }

    /// Remove every key.
    pub fn clear(&mut self) {
        self.notes.clear();
    }

    /// Whether a key is mapped.
    pub fn contains(&self, keycode: Keycode) -> bool {
        self.notes.contains_key(&keycode)
    }

    /// Number of mapped keys.
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// Whether no key is mapped.
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Iterate over `(keycode, note)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (Keycode, Note)> + '_ {
        self.notes.iter().map(|(&k, &n)| (k, n))
    }
}

/// Build the key mapping for a layout.
///
/// Cells whose note would fall outside `range` are left unmapped, as are
/// the dead cells of the organ layout.
pub fn build_mapping(layout: Layout, base_note: Note, range: NoteRange) -> KeyMapping {
    let mut mapping = KeyMapping::new();
    for row in 0..GRID_ROWS {
        for col in 0..GRID_COLUMNS {
            let (Some(keycode), Some(offset)) = (grid_keycode(row, col), layout.offset(row, col))
            else {
                continue;
            };
            mapping.map(keycode, base_note as i32 + offset, range);
        }
    }
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(row: usize, col: usize) -> Keycode {
        grid_keycode(row, col).unwrap()
    }

    #[test]
    fn test_key_grid_shape() {
        assert_eq!(KEY_GRID.chars().count(), GRID_ROWS * GRID_COLUMNS);
        assert_eq!(key(0, 0), Keycode::Char('z'));
        assert_eq!(key(1, 9), Keycode::Char(';'));
        assert_eq!(key(3, 9), Keycode::Char('0'));
        assert!(grid_keycode(4, 0).is_none());
        assert!(grid_keycode(0, 10).is_none());
    }

    #[test]
    fn test_guitar_layout() {
        let mapping = build_mapping(Layout::Guitar, 52, NoteRange::FULL);
        assert_eq!(mapping.note_for(key(0, 0)), Some(52));
        assert_eq!(mapping.note_for(key(0, 1)), Some(53));
        assert_eq!(mapping.note_for(key(1, 0)), Some(57));
        assert_eq!(mapping.len(), 40);
    }

    #[test]
    fn test_isomorphic_steps() {
        let linear = build_mapping(Layout::Linear, 40, NoteRange::FULL);
        assert_eq!(linear.note_for(key(1, 0)), Some(50));
        assert_eq!(linear.note_for(key(3, 9)), Some(79));

        let harpejji = build_mapping(Layout::Harpejji, 40, NoteRange::FULL);
        assert_eq!(harpejji.note_for(key(0, 1)), Some(42));
        assert_eq!(harpejji.note_for(key(1, 0)), Some(41));

        let hexagonal = build_mapping(Layout::Hexagonal, 40, NoteRange::FULL);
        assert_eq!(hexagonal.note_for(key(0, 1)), Some(44));
        assert_eq!(hexagonal.note_for(key(1, 0)), Some(43));
    }

    #[test]
    fn test_organ_layout() {
        let mapping = build_mapping(Layout::Organ, 60, NoteRange::FULL);
        // White row
        assert_eq!(mapping.note_for(key(0, 0)), Some(60));
        assert_eq!(mapping.note_for(key(0, 2)), Some(64));
        assert_eq!(mapping.note_for(key(0, 7)), Some(72));
        // Black row
        assert_eq!(mapping.note_for(key(1, 1)), Some(61));
        assert_eq!(mapping.note_for(key(1, 4)), Some(66));
        // Upper row pair continues after ten white keys
        assert_eq!(mapping.note_for(key(2, 0)), Some(60 + 12 + 5));
    }

    #[test]
    fn test_organ_dead_keys_unmapped() {
        let mapping = build_mapping(Layout::Organ, 60, NoteRange::FULL);
        for row in [1, 3] {
            for col in 0..GRID_COLUMNS {
                let index = (row / 2) * GRID_COLUMNS + col;
                let dead = matches!(index % 7, 0 | 3);
                assert_eq!(!mapping.contains(key(row, col)), dead, "row {row} col {col}");
            }
        }
        // Two dead cells per seven columns on each black row
        assert_eq!(mapping.len(), 40 - 3 - 3);
    }

    #[test]
    fn test_notes_outside_range_are_unmapped() {
        let range = NoteRange::new(60, 64);
        let mapping = build_mapping(Layout::Linear, 58, range);
        assert_eq!(mapping.note_for(key(0, 0)), None);
        assert_eq!(mapping.note_for(key(0, 2)), Some(60));
        assert_eq!(mapping.note_for(key(0, 6)), Some(64));
        assert_eq!(mapping.note_for(key(0, 7)), None);
        assert_eq!(mapping.len(), 5);
    }

    #[test]
    fn test_notes_above_127_are_unmapped() {
        let mapping = build_mapping(Layout::Linear, 120, NoteRange::FULL);
        assert_eq!(mapping.note_for(key(0, 7)), Some(127));
        assert_eq!(mapping.note_for(key(0, 8)), None);
        assert_eq!(mapping.len(), 8);
    }

    #[test]
    fn test_map_replaces_and_unmaps() {
        let mut mapping = KeyMapping::new();
        mapping.map(Keycode::Char('q'), 60, NoteRange::FULL);
        mapping.map(Keycode::Char('q'), 61, NoteRange::FULL);
        assert_eq!(mapping.note_for(Keycode::Char('q')), Some(61));
        mapping.map(Keycode::Char('q'), 200, NoteRange::FULL);
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_layout_names() {
        let names: Vec<_> = Layout::ALL.iter().map(|l| l.to_string()).collect();
        assert_eq!(names, ["Linear", "Guitar", "Organ", "Harpejji", "Hexagonal"]);
    }
}
