//! Reference-counted note state.
//!
//! Several independent causes can hold the same note at once: a computer
//! key, the mouse, and any number of touch points. The tracker counts them
//! per note and only talks to the sink on the 0 -> 1 and 1 -> 0 edges, so
//! letting go of one cause never silences a note another cause still holds.

use std::collections::HashMap;

use crate::engine::NoteStateSink;

use super::layout::{KeyMapping, Keycode};
use super::{Note, NOTE_COUNT};

/// Identifies one pointer: the mouse or a single touch point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerId {
    /// The mouse.
    Mouse,
    /// A touch point, by host-assigned id.
    Touch(u64),
}

/// Something that can hold a note down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cause {
    /// A physical key.
    Key(Keycode),
    /// A pointer pressed on the keyboard.
    Pointer(PointerId),
}

/// Tracks which causes hold which notes and emits paired note events.
#[derive(Clone, Debug)]
pub struct KeyStateTracker {
    channel: u8,
    refcounts: [u16; NOTE_COUNT],
    held: HashMap<Cause, Note>,
}

impl Default for KeyStateTracker {
    fn default() -> Self {
        Self::new(1)
    }
}

impl KeyStateTracker {
    /// Create a tracker emitting on a MIDI channel (1-16).
    pub fn new(channel: u8) -> Self {
        Self {
            channel: channel.clamp(1, 16),
            refcounts: [0; NOTE_COUNT],
            held: HashMap::new(),
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Change the output channel. Callers release notes first.
    pub(crate) fn set_channel(&mut self, channel: u8) {
        debug_assert!(self.held.is_empty(), "changing channel with notes held");
        self.channel = channel.clamp(1, 16);
    }

    /// Number of causes holding a note.
    pub fn refcount(&self, note: Note) -> u16 {
        self.refcounts.get(note as usize).copied().unwrap_or(0)
    }

    /// Whether this tracker is sounding a note.
    pub fn is_sounding(&self, note: Note) -> bool {
        self.refcount(note) > 0
    }

    /// Notes currently sounding, lowest first.
    pub fn sounding_notes(&self) -> impl Iterator<Item = Note> + '_ {
        self.refcounts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(note, _)| note as Note)
    }

    /// Note a cause is holding.
    pub fn held_by(&self, cause: Cause) -> Option<Note> {
        self.held.get(&cause).copied()
    }

    /// Make `cause` hold `note`, or nothing for `None`.
    ///
    /// Whatever the cause held before is let go first. Holding the note it
    /// already holds is a no-op.
    pub fn hold(
        &mut self,
        cause: Cause,
        note: Option<Note>,
        velocity: f32,
        sink: &dyn NoteStateSink,
    ) {
        let previous = self.held.get(&cause).copied();
        if previous == note {
            return;
        }
        if let Some(old) = previous {
            self.held.remove(&cause);
            self.decrement(old, velocity, sink);
        }
        if let Some(new) = note {
            self.held.insert(cause, new);
            self.increment(new, velocity, sink);
        }
    }

    /// Let go of whatever `cause` holds.
    pub fn release(&mut self, cause: Cause, velocity: f32, sink: &dyn NoteStateSink) {
        self.hold(cause, None, velocity, sink);
    }

    /// Apply a physical key transition. Returns whether the key plays a note.
    ///
    /// Auto-repeated key downs are ignored; a key up always releases the
    /// note the key pressed, even if the mapping changed in between.
    pub fn on_physical_key_change(
        &mut self,
        keycode: Keycode,
        is_down: bool,
        mapping: &KeyMapping,
        velocity: f32,
        sink: &dyn NoteStateSink,
    ) -> bool {
        let cause = Cause::Key(keycode);
        if is_down {
            if self.held.contains_key(&cause) {
                return true;
            }
            let Some(note) = mapping.note_for(keycode) else {
                return false;
            };
            self.hold(cause, Some(note), velocity, sink);
            true
        } else if self.held.contains_key(&cause) {
            self.release(cause, velocity, sink);
            true
        } else {
            false
        }
    }

    /// A pointer went down on `note` (or on no note).
    pub fn on_pointer_down(
        &mut self,
        id: PointerId,
        note: Option<Note>,
        velocity: f32,
        sink: &dyn NoteStateSink,
    ) {
        self.hold(Cause::Pointer(id), note, velocity, sink);
    }

    /// A pressed pointer moved onto `note` (or off the keys).
    pub fn on_pointer_move(
        &mut self,
        id: PointerId,
        note: Option<Note>,
        velocity: f32,
        sink: &dyn NoteStateSink,
    ) {
        self.hold(Cause::Pointer(id), note, velocity, sink);
    }

    /// A pointer was lifted.
    pub fn on_pointer_up(&mut self, id: PointerId, velocity: f32, sink: &dyn NoteStateSink) {
        self.release(Cause::Pointer(id), velocity, sink);
    }

    /// Silence every sounding note exactly once and forget every cause.
    pub fn reset_all(&mut self, sink: &dyn NoteStateSink) {
        for note in (0..NOTE_COUNT).rev() {
            if self.refcounts[note] > 0 {
                sink.note_off(self.channel, note as Note, 0.0);
                self.refcounts[note] = 0;
            }
        }
        self.held.clear();
    }

    fn increment(&mut self, note: Note, velocity: f32, sink: &dyn NoteStateSink) {
        let count = &mut self.refcounts[note as usize];
        *count += 1;
        if *count == 1 {
            sink.note_on(self.channel, note, velocity);
        }
    }

    fn decrement(&mut self, note: Note, velocity: f32, sink: &dyn NoteStateSink) {
        let count = &mut self.refcounts[note as usize];
        debug_assert!(*count > 0, "releasing note {note} that is not held");
        *count = count.saturating_sub(1);
        if *count == 0 {
            sink.note_off(self.channel, note, velocity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{RecordingSink, SinkCall};
    use crate::keyboard::geometry::NoteRange;
    use crate::keyboard::layout::{build_mapping, Layout};

    #[test]
    fn test_key_press_and_release() {
        let sink = RecordingSink::default();
        let mut tracker = KeyStateTracker::new(1);
        let mapping = build_mapping(Layout::Guitar, 52, NoteRange::FULL);
        let z = Keycode::Char('z');

        assert!(tracker.on_physical_key_change(z, true, &mapping, 0.8, &sink));
        assert_eq!(
            sink.calls(),
            vec![SinkCall::On { channel: 1, note: 52, velocity: 0.8 }]
        );
        assert!(tracker.is_sounding(52));

        assert!(tracker.on_physical_key_change(z, false, &mapping, 0.8, &sink));
        assert_eq!(sink.count_off(52), 1);
        assert!(!tracker.is_sounding(52));
    }

    #[test]
    fn test_auto_repeat_is_ignored() {
        let sink = RecordingSink::default();
        let mut tracker = KeyStateTracker::new(1);
        let mapping = build_mapping(Layout::Linear, 60, NoteRange::FULL);
        let z = Keycode::Char('z');
        for _ in 0..5 {
            tracker.on_physical_key_change(z, true, &mapping, 1.0, &sink);
        }
        assert_eq!(tracker.refcount(60), 1);
        assert_eq!(sink.count_on(60), 1);
    }

    #[test]
    fn test_unmapped_key_is_noop() {
        let sink = RecordingSink::default();
        let mut tracker = KeyStateTracker::new(1);
        let mapping = build_mapping(Layout::Organ, 60, NoteRange::FULL);
        // 'a' is the first black-row key, a dead slot in the organ layout.
        assert!(!tracker.on_physical_key_change(Keycode::Char('a'), true, &mapping, 1.0, &sink));
        assert!(!tracker.on_physical_key_change(Keycode::Other(7), false, &mapping, 1.0, &sink));
        assert!(sink.calls().is_empty());
    }

    #[test]
    fn test_shared_note_survives_partial_release() {
        let sink = RecordingSink::default();
        let mut tracker = KeyStateTracker::new(1);
        let mapping = build_mapping(Layout::Linear, 60, NoteRange::FULL);

        tracker.on_pointer_down(PointerId::Mouse, Some(60), 0.5, &sink);
        tracker.on_physical_key_change(Keycode::Char('z'), true, &mapping, 1.0, &sink);
        assert_eq!(tracker.refcount(60), 2);

        tracker.on_pointer_up(PointerId::Mouse, 0.5, &sink);
        assert!(tracker.is_sounding(60));
        assert_eq!(sink.count_off(60), 0);

        tracker.on_physical_key_change(Keycode::Char('z'), false, &mapping, 1.0, &sink);
        assert_eq!(sink.count_on(60), 1);
        assert_eq!(sink.count_off(60), 1);
    }

    #[test]
    fn test_interleaved_causes_emit_one_pair() {
        let sink = RecordingSink::default();
        let mut tracker = KeyStateTracker::new(3);
        let causes: Vec<PointerId> = (0..6).map(PointerId::Touch).collect();

        for (i, &id) in causes.iter().enumerate() {
            tracker.on_pointer_down(id, Some(64), 1.0, &sink);
            if i % 2 == 1 {
                tracker.on_pointer_up(causes[i - 1], 1.0, &sink);
                tracker.on_pointer_down(causes[i - 1], Some(64), 1.0, &sink);
            }
        }
        for &id in causes.iter().rev() {
            tracker.on_pointer_up(id, 1.0, &sink);
        }
        assert_eq!(sink.count_on(64), 1);
        assert_eq!(sink.count_off(64), 1);
        assert_eq!(tracker.refcount(64), 0);
    }

    #[test]
    fn test_pointer_glide_between_notes() {
        let sink = RecordingSink::default();
        let mut tracker = KeyStateTracker::new(1);
        let mouse = PointerId::Mouse;
        let finger = PointerId::Touch(1);

        tracker.on_pointer_down(finger, Some(61), 1.0, &sink);
        tracker.on_pointer_down(mouse, Some(60), 1.0, &sink);
        // Sliding onto a note another pointer holds must not retrigger it.
        tracker.on_pointer_move(mouse, Some(61), 1.0, &sink);
        assert_eq!(sink.count_off(60), 1);
        assert_eq!(sink.count_on(61), 1);
        assert_eq!(tracker.refcount(61), 2);

        // Sliding off the keys lets go.
        tracker.on_pointer_move(mouse, None, 1.0, &sink);
        assert_eq!(tracker.held_by(Cause::Pointer(mouse)), None);
        assert!(tracker.is_sounding(61));

        tracker.on_pointer_move(mouse, Some(61), 1.0, &sink);
        tracker.on_pointer_move(mouse, Some(61), 1.0, &sink);
        assert_eq!(tracker.refcount(61), 2);
    }

    #[test]
    fn test_reset_all_silences_each_note_once() {
        let sink = RecordingSink::default();
        let mut tracker = KeyStateTracker::new(1);
        let mapping = build_mapping(Layout::Linear, 60, NoteRange::FULL);

        tracker.on_physical_key_change(Keycode::Char('z'), true, &mapping, 1.0, &sink);
        tracker.on_physical_key_change(Keycode::Char('x'), true, &mapping, 1.0, &sink);
        tracker.on_pointer_down(PointerId::Mouse, Some(60), 1.0, &sink);
        tracker.on_pointer_down(PointerId::Touch(4), Some(70), 1.0, &sink);

        tracker.reset_all(&sink);
        for note in [60, 61, 70] {
            assert_eq!(sink.count_on(note), 1);
            assert_eq!(sink.count_off(note), 1);
        }
        assert_eq!(tracker.sounding_notes().count(), 0);

        // Late key ups after a reset are ignored.
        assert!(!tracker.on_physical_key_change(Keycode::Char('z'), false, &mapping, 1.0, &sink));
        tracker.on_pointer_up(PointerId::Mouse, 1.0, &sink);
        assert_eq!(sink.count_off(60), 1);
    }

    #[test]
    fn test_key_up_releases_note_pressed_under_old_mapping() {
        let sink = RecordingSink::default();
        let mut tracker = KeyStateTracker::new(1);
        let old = build_mapping(Layout::Linear, 60, NoteRange::FULL);
        let new = build_mapping(Layout::Linear, 61, NoteRange::FULL);

        tracker.on_physical_key_change(Keycode::Char('z'), true, &old, 1.0, &sink);
        tracker.on_physical_key_change(Keycode::Char('z'), false, &new, 1.0, &sink);
        assert_eq!(sink.count_off(60), 1);
        assert_eq!(sink.count_on(61), 0);
    }

    #[test]
    fn test_channel_is_clamped() {
        assert_eq!(KeyStateTracker::new(0).channel(), 1);
        assert_eq!(KeyStateTracker::new(40).channel(), 16);
    }
}
