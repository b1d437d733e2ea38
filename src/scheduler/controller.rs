use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cycle::PollCycle;

use super::loop_worker::schedule_loop;
use super::state::{ScheduleStats, ScheduleSummary};

/// Owns the scheduling loop for one run.
pub struct Scheduler {
    cycle: Arc<PollCycle>,
    stats: Arc<ScheduleStats>,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl Scheduler {
    pub fn new(cycle: Arc<PollCycle>) -> Self {
        Self {
            cycle,
            stats: Arc::new(ScheduleStats::new()),
            handle: None,
            cancel_token: None,
        }
    }

    /// Spawns the loop on the current tokio runtime.
    pub fn start(&mut self, period: Duration, max_concurrent: usize) -> Result<()> {
        if self.handle.is_some() {
            bail!("scheduler already running");
        }
        if period.is_zero() {
            bail!("scheduling period must be greater than zero");
        }
        if max_concurrent == 0 {
            bail!("at least one concurrent cycle must be allowed");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(schedule_loop(
            Arc::clone(&self.cycle),
            period,
            max_concurrent,
            Arc::clone(&self.stats),
            cancel_token.clone(),
        ));

        info!(
            "Scheduler started: every {:?}, up to {} overlapping cycles",
            period, max_concurrent
        );

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn summary(&self) -> ScheduleSummary {
        self.stats.snapshot()
    }

    /// Stops ticking and waits for playing cycles to release their notes.
    pub async fn stop(&mut self) -> Result<ScheduleSummary> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle.await.context("scheduler loop failed to join")?;
        }

        Ok(self.stats.snapshot())
    }
}
