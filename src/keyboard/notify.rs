//! Change notifications.
//!
//! Two small collaborators the keyboard holds by composition: a
//! [`ChangeEmitter`] telling the surrounding UI that the visible window
//! moved, and a [`StateChangeFlag`] the note state sink raises whenever a
//! note changes, which the periodic poll then consumes.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::NoteStateListener;

use super::Note;

/// Handle returned by [`ChangeEmitter::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Calls subscribers with the new lowest visible note.
#[derive(Default)]
pub struct ChangeEmitter {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Box<dyn FnMut(Note)>)>,
}

impl ChangeEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, callback: impl FnMut(Note) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    pub fn emit(&mut self, lowest_visible_note: Note) {
        for (_, callback) in &mut self.subscribers {
            callback(lowest_visible_note);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl std::fmt::Debug for ChangeEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeEmitter")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Set from any thread when the sink's notes change; taken by the poll.
#[derive(Debug, Default)]
pub struct StateChangeFlag {
    dirty: AtomicBool,
}

impl StateChangeFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    pub fn is_raised(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }
}

impl NoteStateListener for StateChangeFlag {
    fn note_state_changed(&self, _channel: u8, _note: Note, _is_on: bool) {
        self.raise();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_emitter_calls_subscribers() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut emitter = ChangeEmitter::new();
        let sink = Rc::clone(&seen);
        let id = emitter.subscribe(move |note| sink.borrow_mut().push(note));

        emitter.emit(48);
        emitter.emit(60);
        assert_eq!(*seen.borrow(), vec![48, 60]);

        assert!(emitter.unsubscribe(id));
        assert!(!emitter.unsubscribe(id));
        emitter.emit(72);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_state_change_flag() {
        let flag = StateChangeFlag::new();
        assert!(!flag.take());
        flag.note_state_changed(1, 60, true);
        assert!(flag.is_raised());
        assert!(flag.take());
        assert!(!flag.take());
    }
}
