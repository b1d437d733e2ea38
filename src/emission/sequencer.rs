use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use crate::error::CycleError;
use crate::mapping::Voicing;
use crate::sink::{NoteEvent, NoteSink, DEFAULT_VELOCITY};

use super::event_log::EventLog;

// Set to true to log every note sent
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// What one `emit` call put on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Emission {
    pub pitches: Vec<i32>,
    pub sent: usize,
    pub rejected: usize,
}

/// Plays a chord: all note-ons, a timed hold, then all note-offs.
pub struct EmissionSequencer {
    sink: Arc<dyn NoteSink>,
    channel: u8,
    velocity: u8,
    event_log: Option<Arc<EventLog>>,
}

impl EmissionSequencer {
    pub fn new(sink: Arc<dyn NoteSink>, channel: u8) -> Self {
        Self {
            sink,
            channel,
            velocity: DEFAULT_VELOCITY,
            event_log: None,
        }
    }

    pub fn with_event_log(mut self, event_log: Arc<EventLog>) -> Self {
        self.event_log = Some(event_log);
        self
    }

    /// Sends a note-on for every pitch of `voicing` over `root`, waits
    /// `hold - release`, then sends the note-offs in the same order.
    ///
    /// Every note-off is attempted even when note-ons were rejected, so a
    /// partial failure never leaves a note sounding. Rejections are reported
    /// as [`CycleError::Sink`] once the chord has been released.
    pub async fn emit(
        &self,
        cycle: u64,
        root: i32,
        voicing: &Voicing,
        hold: Duration,
        release: Duration,
    ) -> Result<Emission, CycleError> {
        let pitches = voicing.pitches(root);
        let mut emission = Emission {
            pitches: pitches.clone(),
            ..Emission::default()
        };
        let mut first_error = None;

        for &pitch in &pitches {
            let event = NoteEvent::on(self.channel, pitch, self.velocity);
            self.send(cycle, event, &mut emission, &mut first_error);
        }

        time::sleep(hold.saturating_sub(release)).await;

        for &pitch in &pitches {
            let event = NoteEvent::off(self.channel, pitch, self.velocity);
            self.send(cycle, event, &mut emission, &mut first_error);
        }

        match first_error {
            None => Ok(emission),
            Some(err) => Err(CycleError::Sink(err.context(format!(
                "{} of {} events rejected",
                emission.rejected,
                pitches.len() * 2
            )))),
        }
    }

    fn send(
        &self,
        cycle: u64,
        event: NoteEvent,
        emission: &mut Emission,
        first_error: &mut Option<anyhow::Error>,
    ) {
        match self.sink.send(event) {
            Ok(()) => {
                emission.sent += 1;
                log_debug!("cycle {} {:?} pitch {}", cycle, event.kind, event.pitch);
                if let Some(event_log) = &self.event_log {
                    event_log.record(cycle, event);
                }
            }
            Err(err) => {
                emission.rejected += 1;
                log_warn!(
                    "cycle {} dropped {:?} for pitch {}: {err:#}",
                    cycle,
                    event.kind,
                    event.pitch
                );
                if first_error.is_none() {
                    *first_error = Some(err);
                }
            }
        }
    }
}
