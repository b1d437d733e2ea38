use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared between the scheduling loop and its cycle tasks.
#[derive(Debug, Default)]
pub struct ScheduleStats {
    ticks: AtomicU64,
    played: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl ScheduleStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_played(&self) {
        self.played.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ScheduleSummary {
        ScheduleSummary {
            ticks: self.ticks.load(Ordering::SeqCst),
            played: self.played.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            dropped: self.dropped.load(Ordering::SeqCst),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSummary {
    pub ticks: u64,
    pub played: u64,
    pub skipped: u64,
    pub failed: u64,
    /// Ticks that arrived while the concurrency cap was reached.
    pub dropped: u64,
}

impl fmt::Display for ScheduleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chords played: {}, readings unavailable: {}, failed cycles: {}, dropped ticks: {}",
            self.played, self.skipped, self.failed, self.dropped
        )
    }
}
