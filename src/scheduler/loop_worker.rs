use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::cycle::{CycleOutcome, PollCycle};

use super::state::ScheduleStats;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Fires `cycle` every `period`, starting immediately. A tick that finds
/// `max_concurrent` cycles still running is dropped, not queued.
///
/// Cancellation stops new ticks only; cycles already playing are awaited so
/// no chord is left without its note-offs.
pub(crate) async fn schedule_loop(
    cycle: Arc<PollCycle>,
    period: Duration,
    max_concurrent: usize,
    stats: Arc<ScheduleStats>,
    cancel_token: CancellationToken,
) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let permits = Arc::new(Semaphore::new(max_concurrent));
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                stats.record_tick();

                let Ok(permit) = permits.clone().try_acquire_owned() else {
                    stats.record_dropped();
                    log_warn!("skipping tick: all {} cycle slots busy", max_concurrent);
                    continue;
                };

                let cycle = Arc::clone(&cycle);
                let stats = Arc::clone(&stats);
                in_flight.spawn(async move {
                    let _permit = permit;
                    run_cycle(&cycle, &stats).await;
                });
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(err) = joined {
                    log_error!("cycle task ended abnormally: {err}");
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("scheduler shutting down, waiting for {} playing cycles", in_flight.len());
                break;
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(err) = joined {
            log_error!("cycle task ended abnormally: {err}");
        }
    }
}

async fn run_cycle(cycle: &PollCycle, stats: &ScheduleStats) {
    match cycle.run_once().await {
        Ok(CycleOutcome::Played(report)) => {
            stats.record_played();
            log_info!(
                "cycle {} played {} for {} mg/dL",
                report.index,
                report.chord_name(),
                report.reading.value
            );
        }
        Ok(CycleOutcome::Skipped) => stats.record_skipped(),
        Err(err) => {
            stats.record_failed();
            log_error!("cycle failed [{}]: {err}", err.kind());
        }
    }
}
