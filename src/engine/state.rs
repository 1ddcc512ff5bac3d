//! Shared note state.
//!
//! [`NoteStateSink`] is what the keyboard writes note events into and reads
//! the lit keys back from. [`KeyboardState`] is the stock implementation:
//! per-note channel masks held in atomics so a UI-thread writer and an
//! audio-thread or MIDI-thread reader never block each other, plus an
//! optional rtrb queue carrying the raw events to a consumer thread.

use std::array;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex, Weak};

use rtrb::{Consumer, Producer, RingBuffer};

use super::midi_engine::MidiEvent;
use crate::keyboard::{Note, NOTE_COUNT};

/// Default capacity of the note event queue.
pub const DEFAULT_NOTE_QUEUE_SIZE: usize = 512;

/// Channel mask selecting every MIDI channel.
pub const ALL_CHANNELS: u16 = 0xffff;

/// Gets told about every note change a sink records.
///
/// Implementations run on whichever thread wrote the note, so they should
/// only flag work for later.
pub trait NoteStateListener: Send + Sync {
    fn note_state_changed(&self, channel: u8, note: Note, is_on: bool);
}

/// Destination for note events and source of the current note state.
///
/// Channels are 1-16; `channel_mask` has bit `n - 1` set for channel `n`.
/// Velocities are normalised to 0.0-1.0.
pub trait NoteStateSink {
    fn note_on(&self, channel: u8, note: Note, velocity: f32);

    fn note_off(&self, channel: u8, note: Note, velocity: f32);

    fn is_note_on(&self, channel_mask: u16, note: Note) -> bool;

    /// Register for change callbacks. Dropped listeners are forgotten.
    fn add_listener(&self, _listener: Weak<dyn NoteStateListener>) {}
}

fn channel_bit(channel: u8) -> u16 {
    1 << (channel.clamp(1, 16) - 1)
}

fn midi_velocity(velocity: f32) -> u8 {
    (velocity.clamp(0.0, 1.0) * 127.0).round() as u8
}

/// Lock-free note state shared between threads.
pub struct KeyboardState {
    /// Per-note bitmask of channels the note is on for.
    notes: [AtomicU16; NOTE_COUNT],
    listeners: Mutex<Vec<Weak<dyn NoteStateListener>>>,
    /// Outgoing events for a consumer thread, if one was requested.
    events: Option<Mutex<Producer<MidiEvent>>>,
}

impl Default for KeyboardState {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyboardState {
    /// Create state without an event queue.
    pub fn new() -> Self {
        Self {
            notes: array::from_fn(|_| AtomicU16::new(0)),
            listeners: Mutex::new(Vec::new()),
            events: None,
        }
    }

    /// Create state that also forwards every change as a [`MidiEvent`].
    ///
    /// Returns the state and the consumer end of the event queue. Events
    /// are dropped when the queue is full.
    pub fn with_event_queue(capacity: usize) -> (Self, Consumer<MidiEvent>) {
        let (producer, consumer) = RingBuffer::new(capacity);
        let state = Self {
            events: Some(Mutex::new(producer)),
            ..Self::new()
        };
        (state, consumer)
    }

    /// Turn off every note on a channel.
    pub fn all_notes_off(&self, channel: u8) {
        let bit = channel_bit(channel);
        for note in 0..NOTE_COUNT {
            if self.notes[note].load(Ordering::Acquire) & bit != 0 {
                self.note_off(channel, note as Note, 0.0);
            }
        }
    }

    /// Apply an incoming MIDI event. Returns whether it changed note state.
    pub fn process_event(&self, event: &MidiEvent) -> bool {
        match *event {
            MidiEvent::NoteOn {
                channel,
                note,
                velocity,
            } => {
                self.note_on(channel + 1, note, velocity as f32 / 127.0);
                true
            }
            MidiEvent::NoteOff { channel, note, .. } => {
                self.note_off(channel + 1, note, 0.0);
                true
            }
        }
    }

    fn notify(&self, channel: u8, note: Note, is_on: bool) {
        let Ok(mut listeners) = self.listeners.lock() else {
            return;
        };
        listeners.retain(|listener| match listener.upgrade() {
            Some(listener) => {
                listener.note_state_changed(channel, note, is_on);
                true
            }
            None => false,
        });
    }

    fn forward(&self, event: MidiEvent) {
        let Some(events) = &self.events else {
            return;
        };
        if let Ok(mut producer) = events.lock() {
            if producer.push(event).is_err() {
                log::warn!("note event queue full, dropping {:?}", event);
            }
        }
    }
}

impl NoteStateSink for KeyboardState {
    fn note_on(&self, channel: u8, note: Note, velocity: f32) {
        let Some(slot) = self.notes.get(note as usize) else {
            return;
        };
        slot.fetch_or(channel_bit(channel), Ordering::AcqRel);
        self.forward(MidiEvent::NoteOn {
            channel: channel.clamp(1, 16) - 1,
            note,
            // Velocity 0 would read as a note off on the wire.
            velocity: midi_velocity(velocity).max(1),
        });
        self.notify(channel, note, true);
    }

    fn note_off(&self, channel: u8, note: Note, velocity: f32) {
        let Some(slot) = self.notes.get(note as usize) else {
            return;
        };
        let bit = channel_bit(channel);
        if slot.fetch_and(!bit, Ordering::AcqRel) & bit == 0 {
            return;
        }
        self.forward(MidiEvent::NoteOff {
            channel: channel.clamp(1, 16) - 1,
            note,
            velocity: midi_velocity(velocity),
        });
        self.notify(channel, note, false);
    }

    fn is_note_on(&self, channel_mask: u16, note: Note) -> bool {
        self.notes
            .get(note as usize)
            .is_some_and(|slot| slot.load(Ordering::Acquire) & channel_mask != 0)
    }

    fn add_listener(&self, listener: Weak<dyn NoteStateListener>) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(listener);
        }
    }
}
