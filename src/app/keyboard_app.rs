//! Demo application hosting one chromatic keyboard.
//!
//! The keyboard and an optional MIDI input share one [`KeyboardState`].
//! Every note change is also queued for the monitor strip at the bottom.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use eframe::egui::{self, Align, Layout, RichText, Vec2};
use rtrb::Consumer;

use super::theme;
use crate::engine::{KeyboardState, MidiEngine, MidiError, MidiEvent, DEFAULT_NOTE_QUEUE_SIZE};
use crate::keyboard::{self, ChromaKeyboard, Orientation};
use crate::persistence::{self, SettingsError};
use crate::widgets::chroma_keyboard;

/// Events kept in the monitor strip.
const MONITOR_LENGTH: usize = 24;
/// Thickness of the keyboard across its keys.
const KEYBOARD_DEPTH: f32 = 140.0;

/// Short text for a monitored event.
pub fn event_label(event: &MidiEvent) -> String {
    match *event {
        MidiEvent::NoteOn {
            channel,
            note,
            velocity,
        } => format!("on {note} ch{} v{velocity}", channel + 1),
        MidiEvent::NoteOff { channel, note, .. } => format!("off {note} ch{}", channel + 1),
    }
}

/// Main application state
pub struct KeyboardApp {
    keyboard: ChromaKeyboard,
    /// Note events produced by the shared state.
    events: Consumer<MidiEvent>,
    monitor: VecDeque<MidiEvent>,
    midi: Result<MidiEngine, MidiError>,
    /// Last status or error message to display.
    status: Option<(String, bool)>,
    theme_applied: bool,
}

/// Actions collected from the toolbar for deferred execution
#[derive(Default)]
struct ToolbarActions {
    connect: Option<Option<usize>>,
    save_as: bool,
    open: bool,
    save_default: bool,
}

impl KeyboardApp {
    /// Create the app, restoring the default settings file if there is one.
    pub fn new() -> Self {
        let (state, events) = KeyboardState::with_event_queue(DEFAULT_NOTE_QUEUE_SIZE);
        let state = Arc::new(state);
        let keyboard = ChromaKeyboard::new(state.clone(), Orientation::Horizontal);
        let midi = MidiEngine::new(state);
        if let Err(e) = &midi {
            log::warn!("MIDI input unavailable: {}", e);
        }

        let mut app = Self {
            keyboard,
            events,
            monitor: VecDeque::with_capacity(MONITOR_LENGTH),
            midi,
            status: None,
            theme_applied: false,
        };

        match persistence::default_settings_path().and_then(|p| persistence::load_from_file(&p)) {
            Ok(settings) => app.keyboard.apply_settings(&settings),
            Err(SettingsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no saved keyboard settings");
            }
            Err(e) => app.set_error(format!("Could not load settings: {}", e)),
        }

        app
    }

    fn set_status(&mut self, message: String) {
        self.status = Some((message, false));
    }

    fn set_error(&mut self, message: String) {
        log::warn!("{}", message);
        self.status = Some((message, true));
    }

    fn save_to(&mut self, path: PathBuf) {
        match persistence::save_to_file(&self.keyboard.settings(), &path) {
            Ok(()) => self.set_status(format!("Saved {}", path.display())),
            Err(e) => self.set_error(format!("Save failed: {}", e)),
        }
    }

    fn load_from(&mut self, path: PathBuf) {
        match persistence::load_from_file(&path) {
            Ok(settings) => {
                self.keyboard.apply_settings(&settings);
                self.set_status(format!("Loaded {}", path.display()));
            }
            Err(e) => self.set_error(format!("Load failed: {}", e)),
        }
    }

    fn settings_dialog() -> rfd::FileDialog {
        let dialog = rfd::FileDialog::new().add_filter("Keyboard settings", &["json"]);
        match persistence::default_settings_path() {
            Ok(path) => match path.parent() {
                Some(dir) => dialog.set_directory(dir),
                None => dialog,
            },
            Err(_) => dialog,
        }
    }

    /// Draw the top toolbar with keyboard and MIDI controls
    fn draw_toolbar(&mut self, ui: &mut egui::Ui) -> ToolbarActions {
        let mut actions = ToolbarActions::default();

        ui.horizontal(|ui| {
            ui.add_space(8.0);
            ui.label(
                RichText::new("CHROMA KEYS")
                    .size(18.0)
                    .color(theme::text::PRIMARY)
                    .strong(),
            );
            ui.separator();

            let mut layout = self.keyboard.layout();
            egui::ComboBox::from_label("Layout")
                .selected_text(layout.name())
                .show_ui(ui, |ui| {
                    for option in keyboard::Layout::ALL {
                        ui.selectable_value(&mut layout, option, option.name());
                    }
                });
            self.keyboard.set_layout(layout);

            let mut octave_size = self.keyboard.octave_size();
            ui.label(RichText::new("Octave").color(theme::text::SECONDARY));
            ui.add(egui::DragValue::new(&mut octave_size).range(1..=24));
            self.keyboard.set_octave_size(octave_size);

            let mut base_note = self.keyboard.base_note();
            ui.label(RichText::new("Base").color(theme::text::SECONDARY));
            ui.add(egui::DragValue::new(&mut base_note).range(0..=127));
            self.keyboard.set_base_note(base_note);

            let mut orientation = self.keyboard.orientation();
            egui::ComboBox::from_label("Orientation")
                .selected_text(orientation.name())
                .show_ui(ui, |ui| {
                    for option in Orientation::ALL {
                        ui.selectable_value(&mut orientation, option, option.name());
                    }
                });
            self.keyboard.set_orientation(orientation);

            ui.separator();

            match &self.midi {
                Ok(engine) => {
                    let selected = engine.selected_device();
                    let current = selected
                        .and_then(|i| engine.devices().get(i))
                        .map(|d| d.name.clone())
                        .unwrap_or_else(|| "No MIDI input".to_string());
                    egui::ComboBox::from_label("MIDI")
                        .selected_text(current)
                        .show_ui(ui, |ui| {
                            if ui.selectable_label(selected.is_none(), "None").clicked() {
                                actions.connect = Some(None);
                            }
                            for device in engine.devices() {
                                let is_selected = selected == Some(device.index);
                                if ui.selectable_label(is_selected, &device.name).clicked() {
                                    actions.connect = Some(Some(device.index));
                                }
                            }
                        });
                }
                Err(e) => {
                    ui.label(
                        RichText::new(format!("⚠ MIDI unavailable: {}", e))
                            .color(theme::accent::ERROR),
                    );
                }
            }

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.add_space(8.0);
                actions.save_default = ui.button("Save default").clicked();
                actions.save_as = ui.button("Save…").clicked();
                actions.open = ui.button("Open…").clicked();
            });
        });

        actions
    }

    /// Draw the monitor strip listing recent note events
    fn draw_monitor(&mut self, ui: &mut egui::Ui) {
        while let Ok(event) = self.events.pop() {
            if self.monitor.len() == MONITOR_LENGTH {
                self.monitor.pop_front();
            }
            self.monitor.push_back(event);
        }

        ui.horizontal(|ui| {
            ui.add_space(8.0);
            match &self.status {
                Some((message, true)) => {
                    ui.label(
                        RichText::new(format!("⚠ {}", message))
                            .color(theme::accent::ERROR)
                            .small(),
                    );
                }
                Some((message, false)) => {
                    ui.label(RichText::new(message).color(theme::text::SECONDARY).small());
                }
                None => {
                    ui.label(RichText::new("Ready").color(theme::text::SECONDARY).small());
                }
            }
            ui.separator();

            for event in self.monitor.iter().rev() {
                let colour = match event {
                    MidiEvent::NoteOn { .. } => theme::accent::NOTE_ON,
                    MidiEvent::NoteOff { .. } => theme::accent::NOTE_OFF,
                };
                ui.label(
                    RichText::new(event_label(event))
                        .color(colour)
                        .small()
                        .monospace(),
                );
            }
        });
    }

    /// Draw the keyboard, sized along its note axis to fill the panel
    fn draw_keyboard(&mut self, ui: &mut egui::Ui) {
        let available = ui.available_size();
        let size = if self.keyboard.orientation().is_horizontal() {
            Vec2::new(available.x, KEYBOARD_DEPTH.min(available.y))
        } else {
            Vec2::new(KEYBOARD_DEPTH.min(available.x), available.y)
        };
        chroma_keyboard(ui, &mut self.keyboard, size);
        if !self.keyboard.has_focus() {
            ui.label(
                RichText::new("Click the keyboard to play it from the computer keyboard")
                    .color(theme::text::DISABLED),
            );
        }
    }
}

impl Default for KeyboardApp {
    fn default() -> Self {
        Self::new()
    }
}

impl eframe::App for KeyboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.theme_applied {
            theme::apply_theme(ctx);
            self.theme_applied = true;
        }

        let actions = egui::TopBottomPanel::top("toolbar")
            .frame(
                egui::Frame::none()
                    .fill(theme::background::PANEL)
                    .inner_margin(egui::Margin::symmetric(0.0, 8.0)),
            )
            .show(ctx, |ui| self.draw_toolbar(ui))
            .inner;

        egui::TopBottomPanel::bottom("monitor")
            .frame(
                egui::Frame::none()
                    .fill(theme::background::PANEL)
                    .inner_margin(egui::Margin::symmetric(0.0, 4.0)),
            )
            .show(ctx, |ui| self.draw_monitor(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_keyboard(ui));

        // Handle deferred actions (to avoid borrow checker issues)
        if let Some(device) = actions.connect {
            if let Ok(engine) = &mut self.midi {
                match device {
                    Some(index) => {
                        if let Err(e) = engine.connect(index) {
                            self.set_error(format!("MIDI connect failed: {}", e));
                        }
                    }
                    None => engine.disconnect(),
                }
            }
        }
        if let Ok(engine) = &mut self.midi {
            engine.enumerate_devices();
        }
        if actions.save_as {
            if let Some(path) = Self::settings_dialog().set_file_name("keyboard.json").save_file() {
                self.save_to(path);
            }
        }
        if actions.open {
            if let Some(path) = Self::settings_dialog().pick_file() {
                self.load_from(path);
            }
        }
        if actions.save_default {
            match persistence::default_settings_path() {
                Ok(path) => self.save_to(path),
                Err(e) => self.set_error(format!("Save failed: {}", e)),
            }
        }
    }
}
