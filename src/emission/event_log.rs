// Timed record of every note a run played, written out as a Standard MIDI
// File on shutdown.
//
// Each cycle occupies one bar: cycle n starts its chord at (n - 1) bars and
// releases it at n bars. The tempo meta-event is chosen so one bar lasts
// exactly one hold period, which makes the file play back at the same pace
// the run did. A bar is 4/4 unless the hold is too long for a quarter note
// to fit the largest MIDI tempo, in which case it grows by whole 4/4 groups. Ticks are stored absolute and only turned into deltas on
// flush, so cycles that overlap in wall-clock time still land in order.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use midly::{
    num::{u15, u24, u28, u4, u7},
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};

use crate::sink::{NoteEvent, NoteKind};

/// Ticks per quarter note.
pub const TICKS_PER_BEAT: u16 = 480;

const BEATS_PER_BAR: u32 = 4;
const MAX_TEMPO_MICROS: u32 = 0x00ff_ffff;
const MAX_DELTA_TICKS: u64 = 0x0fff_ffff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LoggedEvent {
    tick: u64,
    kind: NoteKind,
    channel: u8,
    key: u8,
    velocity: u8,
}

pub struct EventLog {
    micros_per_beat: u32,
    beats_per_cycle: u64,
    events: Mutex<Vec<LoggedEvent>>,
}

impl EventLog {
    /// `hold` is the length of one cycle, i.e. one bar.
    pub fn new(hold: Duration) -> Self {
        let hold_micros = hold.as_micros().max(1);
        let max_bar_micros = u128::from(BEATS_PER_BAR) * u128::from(MAX_TEMPO_MICROS);
        let bars = hold_micros.div_ceil(max_bar_micros).min(u128::from(u32::MAX));
        let beats_per_cycle = bars * u128::from(BEATS_PER_BAR);
        let micros_per_beat =
            (hold_micros / beats_per_cycle).clamp(1, u128::from(MAX_TEMPO_MICROS)) as u32;

        Self {
            micros_per_beat,
            beats_per_cycle: beats_per_cycle as u64,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Ticks spanned by one cycle.
    pub fn bar_ticks(&self) -> u64 {
        u64::from(TICKS_PER_BEAT) * self.beats_per_cycle
    }

    pub fn micros_per_beat(&self) -> u32 {
        self.micros_per_beat
    }

    /// Appends an event for the 1-based `cycle`. Note-ons land at the start
    /// of the cycle's bar and note-offs at its end. Pitches that MIDI cannot
    /// represent are left out.
    pub fn record(&self, cycle: u64, event: NoteEvent) {
        let Some([_, key, velocity]) = event.to_midi_bytes() else {
            return;
        };

        let bar = self.bar_ticks();
        let tick = match event.kind {
            NoteKind::On => cycle.saturating_sub(1).saturating_mul(bar),
            NoteKind::Off => cycle.saturating_mul(bar),
        };

        self.lock().push(LoggedEvent {
            tick,
            kind: event.kind,
            channel: event.channel,
            key,
            velocity,
        });
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut events = self.lock().clone();
        // Releases sort ahead of attacks on the same tick so a repeated
        // pitch is not cut off by the previous bar's note-off.
        events.sort_by_key(|event| {
            (
                event.tick,
                match event.kind {
                    NoteKind::Off => 0,
                    NoteKind::On => 1,
                },
            )
        });

        let mut track: Track<'static> = Vec::with_capacity(events.len() + 2);
        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(self.micros_per_beat))),
        });

        let mut last_tick = 0u64;
        for event in &events {
            let delta = (event.tick - last_tick).min(MAX_DELTA_TICKS);
            last_tick = event.tick;

            let key = u7::new(event.key);
            let vel = u7::new(event.velocity);
            let message = match event.kind {
                NoteKind::On => MidiMessage::NoteOn { key, vel },
                NoteKind::Off => MidiMessage::NoteOff { key, vel },
            };
            track.push(TrackEvent {
                delta: u28::new(delta as u32),
                kind: TrackEventKind::Midi {
                    channel: u4::new(event.channel & 0x0f),
                    message,
                },
            });
        }

        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });

        let mut smf = Smf::new(Header::new(
            Format::SingleTrack,
            Timing::Metrical(u15::new(TICKS_PER_BEAT)),
        ));
        smf.tracks.push(track);

        let mut buf = Vec::new();
        smf.write(&mut buf)
            .map_err(anyhow::Error::msg)
            .context("failed to encode MIDI event log")?;
        Ok(buf)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, &bytes)
            .with_context(|| format!("failed to write MIDI event log to {}", path.display()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LoggedEvent>> {
        match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
