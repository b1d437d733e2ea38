use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use crate::emission::EmissionSequencer;
use crate::error::CycleError;
use crate::mapping::{note_name, octave, PitchMapping, Voicing};
use crate::provider::ReadingProvider;

use super::report::CycleReport;

const ENABLE_LOGS: bool = true;

use crate::log_info;

pub type Reporter = Box<dyn Fn(&CycleReport) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Played(CycleReport),
    /// The provider had no usable value; nothing was played.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleTiming {
    /// How long each chord sounds; also the scheduling period.
    pub hold: Duration,
    /// Synth release tail, taken off the hold so the chord dies out near
    /// the next tick.
    pub release: Duration,
    /// Upper bound on one provider call.
    pub fetch_timeout: Duration,
}

/// One poll → map → play iteration, shared by every scheduled invocation.
///
/// The only state carried between calls is the played-cycle counter.
pub struct PollCycle {
    provider: Arc<dyn ReadingProvider>,
    sequencer: EmissionSequencer,
    mapping: PitchMapping,
    timing: CycleTiming,
    cycles: AtomicU64,
    reporter: Reporter,
}

impl PollCycle {
    pub fn new(
        provider: Arc<dyn ReadingProvider>,
        sequencer: EmissionSequencer,
        mapping: PitchMapping,
        timing: CycleTiming,
    ) -> Self {
        Self {
            provider,
            sequencer,
            mapping,
            timing,
            cycles: AtomicU64::new(0),
            reporter: Box::new(|report| println!("{report}")),
        }
    }

    /// Replaces the stdout report printed as each chord starts.
    pub fn with_reporter(
        mut self,
        reporter: impl Fn(&CycleReport) + Send + Sync + 'static,
    ) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    /// Number of cycles that got as far as playing.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    pub async fn run_once(&self) -> Result<CycleOutcome, CycleError> {
        let fetched = time::timeout(self.timing.fetch_timeout, self.provider.current_reading())
            .await
            .map_err(|_| CycleError::ProviderTimeout(self.timing.fetch_timeout))?;

        let reading = match fetched {
            Ok(Some(reading)) if reading.value.is_finite() => reading,
            Ok(_) => {
                log_info!("No glucose reading available at the moment.");
                return Ok(CycleOutcome::Skipped);
            }
            Err(err) => {
                return Err(match err.downcast::<CycleError>() {
                    Ok(cycle_err) => cycle_err,
                    Err(err) => CycleError::Provider(err),
                })
            }
        };

        let index = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;

        let pitch = self.mapping.map(reading.value);
        let voicing = Voicing::for_trend(reading.trend);
        let report = CycleReport {
            index,
            pitch,
            note_name: note_name(pitch),
            octave: octave(pitch),
            chord_suffix: voicing.suffix,
            pitches: voicing.pitches(pitch),
            reading,
        };
        (self.reporter)(&report);

        self.sequencer
            .emit(index, pitch, &voicing, self.timing.hold, self.timing.release)
            .await?;

        Ok(CycleOutcome::Played(report))
    }
}
