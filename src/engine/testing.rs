//! Test doubles for the note state sink.

use std::cell::RefCell;
use std::collections::HashSet;

use super::NoteStateSink;
use crate::keyboard::Note;

/// One call made on a [`RecordingSink`].
#[derive(Clone, Debug, PartialEq)]
pub enum SinkCall {
    On { channel: u8, note: Note, velocity: f32 },
    Off { channel: u8, note: Note, velocity: f32 },
}

/// Sink that records every call and keeps a simple on/off set.
#[derive(Default)]
pub struct RecordingSink {
    calls: RefCell<Vec<SinkCall>>,
    on: RefCell<HashSet<(u8, Note)>>,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.borrow().clone()
    }

    pub fn count_on(&self, note: Note) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, SinkCall::On { note: n, .. } if *n == note))
            .count()
    }

    pub fn count_off(&self, note: Note) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, SinkCall::Off { note: n, .. } if *n == note))
            .count()
    }
}

impl NoteStateSink for RecordingSink {
    fn note_on(&self, channel: u8, note: Note, velocity: f32) {
        self.calls.borrow_mut().push(SinkCall::On {
            channel,
            note,
            velocity,
        });
        self.on.borrow_mut().insert((channel, note));
    }

    fn note_off(&self, channel: u8, note: Note, velocity: f32) {
        self.calls.borrow_mut().push(SinkCall::Off {
            channel,
            note,
            velocity,
        });
        self.on.borrow_mut().remove(&(channel, note));
    }

    fn is_note_on(&self, channel_mask: u16, note: Note) -> bool {
        self.on
            .borrow()
            .iter()
            .any(|&(channel, n)| n == note && channel_mask & (1 << (channel - 1)) != 0)
    }
}
