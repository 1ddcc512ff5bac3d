//! Engine module
//!
//! Shared note state and MIDI input.
//! The keyboard writes into a [`NoteStateSink`]; [`KeyboardState`] is the
//! thread-safe implementation the application shares with its MIDI input.

pub mod midi_engine;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use midi_engine::{MidiDeviceInfo, MidiEngine, MidiError, MidiEvent};
pub use state::{
    KeyboardState, NoteStateListener, NoteStateSink, ALL_CHANNELS, DEFAULT_NOTE_QUEUE_SIZE,
};
