//! The keyboard component.
//!
//! [`ChromaKeyboard`] owns the geometry, the key mapping and the note
//! tracker, and routes host input events into them. It never talks to a
//! GUI toolkit: the host feeds it [`InputEvent`]s, asks it what to repaint,
//! and paints through [`super::render::paint_keyboard`].

use std::collections::HashMap;
use std::sync::Arc;

use egui::{Pos2, Vec2};

use crate::engine::{NoteStateListener, NoteStateSink, ALL_CHANNELS};
use crate::persistence::KeyboardSettings;

use super::geometry::{KeyGeometry, NoteRange, Orientation, ScrollDirection};
use super::input::{wheel_amount, InputEvent, PointerTrack, Repaint};
use super::layout::{build_mapping, KeyMapping, Keycode, Layout};
use super::notify::{ChangeEmitter, StateChangeFlag, SubscriptionId};
use super::style::KeyboardStyle;
use super::tracker::{Cause, KeyStateTracker, PointerId};
use super::{Note, DEFAULT_BASE_NOTE, MAX_NOTE, NOTE_COUNT};

/// How often the host should call [`ChromaKeyboard::poll`].
pub const POLL_HZ: u32 = 40;

/// On-screen chromatic keyboard.
pub struct ChromaKeyboard {
    sink: Arc<dyn NoteStateSink>,
    geometry: KeyGeometry,
    style: KeyboardStyle,
    layout: Layout,
    base_note: Note,
    mapping: KeyMapping,
    tracker: KeyStateTracker,
    pointers: HashMap<PointerId, PointerTrack>,
    velocity: f32,
    use_position_velocity: bool,
    channels_to_display: u16,
    /// Sink state as of the last poll.
    drawn_down: [bool; NOTE_COUNT],
    state_flag: Arc<StateChangeFlag>,
    window_changed: ChangeEmitter,
    /// The window moved during the current operation.
    window_moved: bool,
    repaint: Repaint,
    has_focus: bool,
    scroll_hover: Option<ScrollDirection>,
    scroll_pressed: Option<(PointerId, ScrollDirection)>,
}

impl ChromaKeyboard {
    /// Create a keyboard writing to `sink`.
    pub fn new(sink: Arc<dyn NoteStateSink>, orientation: Orientation) -> Self {
        let state_flag = Arc::new(StateChangeFlag::new());
        let listener: Arc<dyn NoteStateListener> = state_flag.clone();
        sink.add_listener(Arc::downgrade(&listener));
        // Pick up whatever the sink already holds on the first poll.
        state_flag.raise();

        let geometry = KeyGeometry::new(orientation);
        let layout = Layout::default();
        let mapping = build_mapping(layout, DEFAULT_BASE_NOTE, geometry.range());

        let mut repaint = Repaint::default();
        repaint.everything();

        Self {
            sink,
            geometry,
            style: KeyboardStyle::default(),
            layout,
            base_note: DEFAULT_BASE_NOTE,
            mapping,
            tracker: KeyStateTracker::new(1),
            pointers: HashMap::new(),
            velocity: 1.0,
            use_position_velocity: true,
            channels_to_display: ALL_CHANNELS,
            drawn_down: [false; NOTE_COUNT],
            state_flag,
            window_changed: ChangeEmitter::new(),
            window_moved: false,
            repaint,
            has_focus: false,
            scroll_hover: None,
            scroll_pressed: None,
        }
    }

    /// Replace the colouring and labelling strategies.
    pub fn with_style(mut self, style: KeyboardStyle) -> Self {
        self.style = style;
        self
    }

    // Getters

    pub fn sink(&self) -> &dyn NoteStateSink {
        self.sink.as_ref()
    }

    pub fn geometry(&self) -> &KeyGeometry {
        &self.geometry
    }

    pub fn style(&self) -> &KeyboardStyle {
        &self.style
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn base_note(&self) -> Note {
        self.base_note
    }

    pub fn mapping(&self) -> &KeyMapping {
        &self.mapping
    }

    pub fn tracker(&self) -> &KeyStateTracker {
        &self.tracker
    }

    pub fn range(&self) -> NoteRange {
        self.geometry.range()
    }

    pub fn channel(&self) -> u8 {
        self.tracker.channel()
    }

    pub fn channels_to_display(&self) -> u16 {
        self.channels_to_display
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn use_position_velocity(&self) -> bool {
        self.use_position_velocity
    }

    pub fn key_width(&self) -> f32 {
        self.geometry.key_width()
    }

    pub fn octave_size(&self) -> u32 {
        self.geometry.octave_size()
    }

    pub fn orientation(&self) -> Orientation {
        self.geometry.orientation()
    }

    pub fn lowest_visible_note(&self) -> Note {
        self.geometry.lowest_visible_note()
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    /// Whether a note lights up for the displayed channels.
    pub fn is_note_on(&self, note: Note) -> bool {
        self.sink.is_note_on(self.channels_to_display, note)
    }

    /// Whether any pointer hovers over a note.
    pub fn is_note_hovered(&self, note: Note) -> bool {
        self.pointers
            .values()
            .any(|track| track.hovered == Some(note))
    }

    /// Hover and press state of a scroll button.
    pub fn scroll_button_state(&self, direction: ScrollDirection) -> (bool, bool) {
        let over = self.scroll_hover == Some(direction);
        let down = self
            .scroll_pressed
            .is_some_and(|(_, pressed)| pressed == direction);
        (over, down)
    }

    /// Note under a local position, or `None` off the keys or over a scroll
    /// button.
    pub fn note_at_position(&self, pos: Pos2) -> Option<Note> {
        self.note_under(pos).map(|(note, _)| note)
    }

    // Configuration

    /// Restrict the keyboard to `start..=end`. `start <= end` is required.
    pub fn set_range(&mut self, start: Note, end: Note) {
        self.apply_range(start, end);
        self.flush_window_change();
    }

    /// Choose the output channel (1-16). Sounding notes are released first.
    pub fn set_channel(&mut self, channel: u8) {
        debug_assert!((1..=16).contains(&channel), "MIDI channel {channel} out of range");
        let channel = channel.clamp(1, 16);
        if channel == self.tracker.channel() {
            return;
        }
        self.reset_all();
        self.tracker.set_channel(channel);
    }

    /// Choose which channels light up the keys.
    pub fn set_channels_to_display(&mut self, mask: u16) {
        if mask != self.channels_to_display {
            self.channels_to_display = mask;
            self.state_flag.raise();
        }
    }

    /// Set the note velocity and whether pointers scale it by position.
    pub fn set_velocity(&mut self, velocity: f32, use_position_velocity: bool) {
        self.velocity = velocity.clamp(0.0, 1.0);
        self.use_position_velocity = use_position_velocity;
    }

    pub fn set_layout(&mut self, layout: Layout) {
        if layout != self.layout {
            self.layout = layout;
            self.rebuild_mapping();
        }
    }

    /// Set the note played by the bottom-left key of the grid.
    pub fn set_base_note(&mut self, note: Note) {
        debug_assert!(note <= MAX_NOTE, "base note {note} out of range");
        let note = note.min(MAX_NOTE);
        if note != self.base_note {
            self.base_note = note;
            self.rebuild_mapping();
        }
    }

    /// Move the base note by `delta` semitones, staying in 0-127.
    pub fn shift_base_note(&mut self, delta: i32) {
        let note = (self.base_note as i32 + delta).clamp(0, MAX_NOTE as i32);
        self.set_base_note(note as Note);
    }

    pub fn set_key_width(&mut self, key_width: f32) {
        self.update_geometry(|g| g.set_key_width(key_width));
        self.flush_window_change();
    }

    pub fn set_octave_size(&mut self, octave_size: u32) {
        self.update_geometry(|g| g.set_octave_size(octave_size));
        self.flush_window_change();
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.update_geometry(|g| g.set_orientation(orientation));
        self.flush_window_change();
    }

    /// Tell the keyboard its size in local pixels.
    pub fn set_size(&mut self, size: Vec2) {
        self.update_geometry(|g| g.set_size(size));
        self.flush_window_change();
    }

    pub fn set_scroll_button_width(&mut self, width: f32) {
        self.update_geometry(|g| g.set_scroll_button_width(width));
        self.flush_window_change();
    }

    pub fn set_scroll_buttons_visible(&mut self, visible: bool) {
        self.update_geometry(|g| g.set_scroll_buttons_visible(visible));
        self.flush_window_change();
    }

    /// Scroll so `note` is the lowest visible note, if the window allows it.
    pub fn set_lowest_visible_note(&mut self, note: Note) {
        self.update_geometry(|g| g.set_first_visible_note(note as f32));
        self.flush_window_change();
    }

    // Notifications

    /// Call `callback` with the new lowest visible note whenever the window
    /// scrolls by at least one whole note.
    pub fn subscribe_window_changed(
        &mut self,
        callback: impl FnMut(Note) + 'static,
    ) -> SubscriptionId {
        self.window_changed.subscribe(callback)
    }

    pub fn unsubscribe_window_changed(&mut self, id: SubscriptionId) -> bool {
        self.window_changed.unsubscribe(id)
    }

    /// Re-read the sink if it reported changes. Returns the notes whose lit
    /// state changed since the last poll.
    pub fn poll(&mut self) -> Vec<Note> {
        if !self.state_flag.take() {
            return Vec::new();
        }
        let mut changed = Vec::new();
        for note in self.geometry.range().notes() {
            let down = self.sink.is_note_on(self.channels_to_display, note);
            let drawn = &mut self.drawn_down[note as usize];
            if *drawn != down {
                *drawn = down;
                changed.push(note);
                self.repaint.note(Some(note));
            }
        }
        changed
    }

    /// Take the pending repaint request.
    pub fn take_repaint(&mut self) -> Repaint {
        std::mem::take(&mut self.repaint)
    }

    // Input

    /// Route one host event. Returns whether the keyboard used it.
    pub fn handle_event(&mut self, event: InputEvent) -> bool {
        let handled = match event {
            InputEvent::PointerEnter { id, pos } | InputEvent::PointerMove { id, pos } => {
                self.pointer_moved(id, pos);
                true
            }
            InputEvent::PointerDown { id, pos } => self.pointer_down(id, pos),
            InputEvent::PointerUp { id, pos } => {
                self.pointer_up(id, pos);
                true
            }
            InputEvent::PointerExit { id } => {
                self.pointer_exit(id);
                true
            }
            InputEvent::Wheel { delta } => self.wheel(delta),
            InputEvent::KeyDown(keycode) => self.key_down(keycode),
            InputEvent::KeyUp(keycode) => self.key_up(keycode),
            InputEvent::FocusGained => {
                self.has_focus = true;
                true
            }
            InputEvent::FocusLost => {
                self.has_focus = false;
                self.reset_all();
                true
            }
        };
        self.flush_window_change();
        handled
    }

    /// Silence everything this keyboard is holding and drop every press.
    pub fn reset_all(&mut self) {
        self.tracker.reset_all(self.sink.as_ref());
        for track in self.pointers.values_mut() {
            track.held = None;
            track.pressed = false;
        }
        self.scroll_pressed = None;
        self.repaint.everything();
        log::debug!("keyboard reset");
    }

    fn pointer_velocity(&self, position_velocity: f32) -> f32 {
        if self.use_position_velocity {
            (position_velocity * self.velocity).clamp(0.0, 1.0)
        } else {
            self.velocity
        }
    }

    fn note_under(&self, pos: Pos2) -> Option<(Note, f32)> {
        if self.geometry.scroll_buttons().hit(pos).is_some() {
            return None;
        }
        self.geometry.pixel_to_note(pos)
    }

    fn pointer_moved(&mut self, id: PointerId, pos: Pos2) {
        if id == PointerId::Mouse {
            let hover = self.geometry.scroll_buttons().hit(pos);
            if hover != self.scroll_hover {
                self.scroll_hover = hover;
                self.repaint.everything();
            }
        }

        let hit = self.note_under(pos);
        let note = hit.map(|(note, _)| note);
        let velocity = self.pointer_velocity(hit.map_or(0.0, |(_, v)| v));
        let mut track = self.pointers.get(&id).copied().unwrap_or_default();

        if track.hovered != note {
            self.repaint.note(track.hovered);
            self.repaint.note(note);
            track.hovered = note;
        }
        if track.pressed && track.held != note {
            self.tracker
                .on_pointer_move(id, note, velocity, self.sink.as_ref());
            self.repaint.note(track.held);
            self.repaint.note(note);
            track.held = note;
        }
        self.pointers.insert(id, track);
    }

    fn pointer_down(&mut self, id: PointerId, pos: Pos2) -> bool {
        if let Some(direction) = self.geometry.scroll_buttons().hit(pos) {
            self.scroll_pressed = Some((id, direction));
            let target = self.geometry.scroll_target(direction);
            self.update_geometry(|g| g.set_first_visible_note(target as f32));
            return true;
        }

        let hit = self.geometry.pixel_to_note(pos);
        let note = hit.map(|(note, _)| note);
        let velocity = self.pointer_velocity(hit.map_or(0.0, |(_, v)| v));
        let mut track = self.pointers.get(&id).copied().unwrap_or_default();

        self.tracker
            .on_pointer_down(id, note, velocity, self.sink.as_ref());
        self.repaint.note(track.held);
        self.repaint.note(track.hovered);
        self.repaint.note(note);
        track.pressed = true;
        track.held = note;
        track.hovered = note;
        self.pointers.insert(id, track);
        note.is_some()
    }

    fn pointer_up(&mut self, id: PointerId, pos: Pos2) {
        if self.scroll_pressed.is_some_and(|(owner, _)| owner == id) {
            self.scroll_pressed = None;
            self.repaint.everything();
        }

        self.tracker.on_pointer_up(id, self.velocity, self.sink.as_ref());
        let Some(mut track) = self.pointers.remove(&id) else {
            return;
        };
        self.repaint.note(track.held);
        self.repaint.note(track.hovered);

        // A lifted finger is gone; the mouse keeps hovering.
        if id == PointerId::Mouse {
            track.pressed = false;
            track.held = None;
            track.hovered = self.note_at_position(pos);
            self.repaint.note(track.hovered);
            self.pointers.insert(id, track);
        }
    }

    fn pointer_exit(&mut self, id: PointerId) {
        self.tracker.on_pointer_up(id, self.velocity, self.sink.as_ref());
        if let Some(track) = self.pointers.remove(&id) {
            self.repaint.note(track.held);
            self.repaint.note(track.hovered);
        }
        if id == PointerId::Mouse && self.scroll_hover.take().is_some() {
            self.repaint.everything();
        }
    }

    fn wheel(&mut self, delta: Vec2) -> bool {
        let amount = wheel_amount(self.geometry.orientation(), delta);
        if amount == 0.0 {
            return false;
        }
        let target = self.geometry.first_visible_note() - amount * self.geometry.key_width();
        self.update_geometry(|g| g.set_first_visible_note(target));
        true
    }

    fn key_down(&mut self, keycode: Keycode) -> bool {
        let octave = self.geometry.octave_size() as i32;
        match keycode {
            Keycode::Escape => self.reset_all(),
            Keycode::Up => self.shift_base_note(1),
            Keycode::Down => self.shift_base_note(-1),
            Keycode::PageUp => self.shift_base_note(octave),
            Keycode::PageDown => self.shift_base_note(-octave),
            Keycode::Char(_) | Keycode::Other(_) => {
                let used = self.tracker.on_physical_key_change(
                    keycode,
                    true,
                    &self.mapping,
                    self.velocity,
                    self.sink.as_ref(),
                );
                self.repaint.note(self.tracker.held_by(Cause::Key(keycode)));
                return used;
            }
        }
        true
    }

    fn key_up(&mut self, keycode: Keycode) -> bool {
        match keycode {
            Keycode::Char(_) | Keycode::Other(_) => {
                let held = self.tracker.held_by(Cause::Key(keycode));
                self.repaint.note(held);
                self.tracker.on_physical_key_change(
                    keycode,
                    false,
                    &self.mapping,
                    self.velocity,
                    self.sink.as_ref(),
                )
            }
            _ => true,
        }
    }

    /// Run a geometry change, noting whether the window moved.
    fn update_geometry(&mut self, change: impl FnOnce(&mut KeyGeometry) -> bool) {
        let before = self.geometry.clone();
        self.window_moved |= change(&mut self.geometry);
        if self.geometry != before {
            self.repaint.everything();
        }
    }

    fn apply_range(&mut self, start: Note, end: Note) {
        let range = NoteRange::new(start, end);
        if range == self.geometry.range() {
            return;
        }
        self.update_geometry(|g| g.set_range(range));
        // Notes outside the range are never polled, so forget their lit
        // state and re-read the sink for the new range.
        for note in (0..=MAX_NOTE).filter(|&n| !range.contains(n)) {
            self.drawn_down[note as usize] = false;
        }
        self.state_flag.raise();
        self.rebuild_mapping();
    }

    /// Release everything and map the grid afresh.
    fn rebuild_mapping(&mut self) {
        self.reset_all();
        self.mapping = build_mapping(self.layout, self.base_note, self.geometry.range());
        log::debug!(
            "mapped {} keys for {} layout from note {}",
            self.mapping.len(),
            self.layout,
            self.base_note
        );
    }

    /// Tell subscribers the window moved, at most once per public call.
    fn flush_window_change(&mut self) {
        if !self.window_moved {
            return;
        }
        self.window_moved = false;
        let lowest = self.geometry.lowest_visible_note();
        log::debug!("visible window now starts at note {lowest}");
        self.window_changed.emit(lowest);
    }

    // Settings

    /// Snapshot every user-facing parameter.
    pub fn settings(&self) -> KeyboardSettings {
        let range = self.geometry.range();
        KeyboardSettings {
            layout: self.layout,
            base_note: self.base_note,
            octave_size: self.geometry.octave_size(),
            range_start: range.start,
            range_end: range.end,
            lowest_visible_note: self.geometry.lowest_visible_note(),
            key_width: self.geometry.key_width(),
            scroll_button_width: self.geometry.scroll_button_width(),
            scroll_buttons_visible: self.geometry.can_scroll(),
            orientation: self.geometry.orientation(),
            midi_channel: self.tracker.channel(),
            channels_to_display: self.channels_to_display,
            velocity: self.velocity,
            use_position_velocity: self.use_position_velocity,
            ..KeyboardSettings::default()
        }
    }

    /// Restore a snapshot through the validated setters.
    ///
    /// Values come from files, so they are clamped here rather than
    /// treated as caller errors.
    pub fn apply_settings(&mut self, settings: &KeyboardSettings) {
        let start = settings.range_start.min(MAX_NOTE);
        let end = settings.range_end.clamp(start, MAX_NOTE);
        self.apply_range(start, end);
        self.update_geometry(|g| {
            let mut moved = g.set_orientation(settings.orientation);
            moved |= g.set_key_width(settings.key_width.max(1.0));
            moved |= g.set_octave_size(settings.octave_size.max(1));
            moved |= g.set_scroll_button_width(settings.scroll_button_width.max(1.0));
            moved |= g.set_scroll_buttons_visible(settings.scroll_buttons_visible);
            moved |= g.set_first_visible_note(settings.lowest_visible_note as f32);
            moved
        });
        self.set_layout(settings.layout);
        self.set_base_note(settings.base_note.min(MAX_NOTE));
        self.set_channel(settings.midi_channel.clamp(1, 16));
        self.set_channels_to_display(settings.channels_to_display);
        self.set_velocity(settings.velocity, settings.use_position_velocity);
        self.flush_window_change();
    }
}

impl std::fmt::Debug for ChromaKeyboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromaKeyboard")
            .field("geometry", &self.geometry)
            .field("layout", &self.layout)
            .field("base_note", &self.base_note)
            .field("channel", &self.tracker.channel())
            .finish_non_exhaustive()
    }
}
