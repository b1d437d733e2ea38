pub mod log_sink;
pub mod midi_port;

pub use log_sink::LogSink;
pub use midi_port::{list_output_ports, MidiPortSink};

use anyhow::Result;
use serde::Serialize;

/// Velocity used for every note-on and note-off.
pub const DEFAULT_VELOCITY: u8 = 64;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NoteKind {
    On,
    Off,
}

/// A single note message. `pitch` is whatever the voicing produced and may
/// fall outside the 0-127 MIDI range.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    pub kind: NoteKind,
    pub channel: u8,
    pub pitch: i32,
    pub velocity: u8,
}

impl NoteEvent {
    pub fn on(channel: u8, pitch: i32, velocity: u8) -> Self {
        Self {
            kind: NoteKind::On,
            channel,
            pitch,
            velocity,
        }
    }

    pub fn off(channel: u8, pitch: i32, velocity: u8) -> Self {
        Self {
            kind: NoteKind::Off,
            channel,
            pitch,
            velocity,
        }
    }

    /// Raw three-byte channel voice message, or `None` when the pitch cannot
    /// be expressed on the wire.
    pub fn to_midi_bytes(&self) -> Option<[u8; 3]> {
        let key = u8::try_from(self.pitch).ok().filter(|key| *key <= 127)?;
        let status = match self.kind {
            NoteKind::On => 0x90,
            NoteKind::Off => 0x80,
        } | (self.channel & 0x0f);
        Some([status, key, self.velocity.min(127)])
    }
}

/// Destination for note events. Shared between concurrently running cycles.
pub trait NoteSink: Send + Sync {
    fn send(&self, event: NoteEvent) -> Result<()>;

    /// Human-readable destination, for startup logging.
    fn describe(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_on_and_off_bytes() {
        assert_eq!(NoteEvent::on(0, 60, 64).to_midi_bytes(), Some([0x90, 60, 64]));
        assert_eq!(NoteEvent::off(3, 60, 64).to_midi_bytes(), Some([0x83, 60, 64]));
    }

    #[test]
    fn out_of_range_pitch_has_no_encoding() {
        assert_eq!(NoteEvent::on(0, 128, 64).to_midi_bytes(), None);
        assert_eq!(NoteEvent::off(0, -1, 64).to_midi_bytes(), None);
        assert_eq!(NoteEvent::on(0, 127, 64).to_midi_bytes(), Some([0x90, 127, 64]));
    }
}
