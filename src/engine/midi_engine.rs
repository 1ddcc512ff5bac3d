//! MIDI Engine
//!
//! Receives notes from hardware controllers and virtual MIDI ports and
//! plays them into a shared [`KeyboardState`], so the on-screen keyboard
//! lights up for notes it did not originate. Uses midir for cross-platform
//! MIDI access.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use midir::{MidiInput, MidiInputConnection, MidiInputPort};

use super::state::KeyboardState;

/// Client name registered with the MIDI subsystem.
const CLIENT_NAME: &str = "Chroma Keys";

/// How often the port list is rescanned for hot-plugged devices.
const SCAN_INTERVAL: Duration = Duration::from_secs(2);

/// Information about a MIDI input device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiDeviceInfo {
    /// Human-readable device name.
    pub name: String,
    /// Internal port index.
    pub index: usize,
}

/// Note messages understood by the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    /// Note On event.
    NoteOn {
        /// MIDI channel (0-15).
        channel: u8,
        /// Note number (0-127).
        note: u8,
        /// Velocity (1-127).
        velocity: u8,
    },
    /// Note Off event.
    NoteOff {
        /// MIDI channel (0-15).
        channel: u8,
        /// Note number (0-127).
        note: u8,
        /// Release velocity (0-127, often ignored).
        velocity: u8,
    },
}

impl MidiEvent {
    /// Parse a note message from raw bytes.
    /// Returns None for other or malformed messages.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let &[status, note, velocity, ..] = data else {
            return None;
        };
        let channel = status & 0x0F;
        let note = note & 0x7F;
        let velocity = velocity & 0x7F;

        match status & 0xF0 {
            // Note On with velocity 0 is a Note Off
            0x90 if velocity == 0 => Some(MidiEvent::NoteOff {
                channel,
                note,
                velocity: 0,
            }),
            0x90 => Some(MidiEvent::NoteOn {
                channel,
                note,
                velocity,
            }),
            0x80 => Some(MidiEvent::NoteOff {
                channel,
                note,
                velocity,
            }),
            _ => None,
        }
    }

    /// Get the MIDI channel for this event.
    pub fn channel(&self) -> u8 {
        match self {
            MidiEvent::NoteOn { channel, .. } | MidiEvent::NoteOff { channel, .. } => *channel,
        }
    }

    /// Get the note number for this event.
    pub fn note(&self) -> u8 {
        match self {
            MidiEvent::NoteOn { note, .. } | MidiEvent::NoteOff { note, .. } => *note,
        }
    }
}

/// Error type for MIDI operations.
#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    /// Failed to initialize MIDI subsystem.
    #[error("MIDI init error: {0}")]
    InitError(String),
    /// Failed to connect to device.
    #[error("MIDI connection error: {0}")]
    ConnectionError(String),
    /// Device not found.
    #[error("MIDI device not found")]
    DeviceNotFound,
}

/// Port list shared with the scan thread.
struct MidiPorts {
    ports: Vec<MidiInputPort>,
    names: Vec<String>,
}

fn scan_ports(midi_in: &MidiInput) -> MidiPorts {
    let ports: Vec<MidiInputPort> = midi_in.ports().into_iter().collect();
    let names = ports
        .iter()
        .map(|p| midi_in.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
        .collect();
    MidiPorts { ports, names }
}

/// MIDI input feeding a shared [`KeyboardState`].
pub struct MidiEngine {
    /// Cached device list.
    devices: Vec<MidiDeviceInfo>,
    /// Currently selected device index (None = no device).
    selected_device: Option<usize>,
    /// Active MIDI connection.
    connection: Option<MidiInputConnection<()>>,
    /// Where incoming notes are played.
    state: Arc<KeyboardState>,
    /// Port list refreshed by the scan thread.
    ports: Arc<Mutex<MidiPorts>>,
    /// Flag to signal device scan thread to stop.
    scan_running: Arc<AtomicBool>,
    /// Handle for the device scan thread.
    scan_thread: Option<thread::JoinHandle<()>>,
}

impl MidiEngine {
    /// Create a new MIDI engine playing into `state`.
    pub fn new(state: Arc<KeyboardState>) -> Result<Self, MidiError> {
        let midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| MidiError::InitError(e.to_string()))?;
        let ports = Arc::new(Mutex::new(scan_ports(&midi_in)));

        // Background rescans pick up hot-plugged devices
        let scan_running = Arc::new(AtomicBool::new(true));
        let ports_clone = Arc::clone(&ports);
        let running_clone = Arc::clone(&scan_running);

        let scan_thread = thread::spawn(move || {
            while running_clone.load(Ordering::Relaxed) {
                thread::sleep(SCAN_INTERVAL);

                if !running_clone.load(Ordering::Relaxed) {
                    break;
                }

                if let Ok(midi_in) = MidiInput::new(CLIENT_NAME) {
                    let scanned = scan_ports(&midi_in);
                    if let Ok(mut ports) = ports_clone.lock() {
                        *ports = scanned;
                    }
                }
            }
        });

        let mut engine = Self {
            devices: Vec::new(),
            selected_device: None,
            connection: None,
            state,
            ports,
            scan_running,
            scan_thread: Some(scan_thread),
        };
        engine.enumerate_devices();
        log::info!("MIDI engine found {} input device(s)", engine.devices.len());

        Ok(engine)
    }

    /// Enumerate available MIDI input devices.
    /// This returns a fresh list reflecting any hot-plugged devices.
    pub fn enumerate_devices(&mut self) -> Vec<MidiDeviceInfo> {
        if let Ok(ports) = self.ports.lock() {
            self.devices = ports
                .names
                .iter()
                .enumerate()
                .map(|(index, name)| MidiDeviceInfo {
                    name: name.clone(),
                    index,
                })
                .collect();
        }
        self.devices.clone()
    }

    /// Get the currently cached device list without rescanning.
    pub fn devices(&self) -> &[MidiDeviceInfo] {
        &self.devices
    }

    /// Get the currently selected device index.
    pub fn selected_device(&self) -> Option<usize> {
        self.selected_device
    }

    /// Connect to a MIDI device by index.
    pub fn connect(&mut self, device_index: usize) -> Result<(), MidiError> {
        self.disconnect();

        let port = {
            let ports = self
                .ports
                .lock()
                .map_err(|_| MidiError::ConnectionError("Failed to lock port list".to_string()))?;
            ports
                .ports
                .get(device_index)
                .cloned()
                .ok_or(MidiError::DeviceNotFound)?
        };

        let midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| MidiError::InitError(e.to_string()))?;

        let state = Arc::clone(&self.state);
        let connection = midi_in
            .connect(
                &port,
                "Chroma Keys Input",
                move |_timestamp_us, data, _| {
                    if let Some(event) = MidiEvent::from_bytes(data) {
                        log::trace!("MIDI: {:?}", event);
                        state.process_event(&event);
                    }
                },
                (),
            )
            .map_err(|e| MidiError::ConnectionError(e.to_string()))?;

        self.connection = Some(connection);
        self.selected_device = Some(device_index);

        log::info!(
            "MIDI connected to device {}: {}",
            device_index,
            self.devices
                .get(device_index)
                .map(|d| d.name.as_str())
                .unwrap_or("Unknown")
        );

        Ok(())
    }

    /// Disconnect from the current MIDI device.
    pub fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            self.selected_device = None;
            log::info!("MIDI disconnected");
        }
    }

    /// Check if currently connected to a device.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}

impl Drop for MidiEngine {
    fn drop(&mut self) {
        self.scan_running.store(false, Ordering::Relaxed);
        self.disconnect();
        if let Some(thread) = self.scan_thread.take() {
            let _ = thread.join();
        }
    }
}
