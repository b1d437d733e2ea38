use anyhow::Result;

use super::{NoteEvent, NoteKind, NoteSink};

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Sink for `--dry-run`: writes each event to the log and nothing else.
/// Pitches outside the MIDI range pass through untouched.
pub struct LogSink;

impl NoteSink for LogSink {
    fn send(&self, event: NoteEvent) -> Result<()> {
        let kind = match event.kind {
            NoteKind::On => "note_on",
            NoteKind::Off => "note_off",
        };
        log_info!(
            "{} channel={} note={} velocity={}",
            kind,
            event.channel,
            event.pitch,
            event.velocity
        );
        Ok(())
    }

    fn describe(&self) -> String {
        "log output (dry run)".to_string()
    }
}
