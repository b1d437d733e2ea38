//! In-memory doubles for the provider and sink seams.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{TimeZone, Utc};

use crate::models::{Reading, Trend};
use crate::provider::{ProviderFuture, ReadingProvider};
use crate::sink::{NoteEvent, NoteSink};

pub fn reading(value: f64, trend: Trend) -> Reading {
    let timestamp = Utc
        .with_ymd_and_hms(2024, 3, 9, 14, 5, 0)
        .single()
        .unwrap_or_else(Utc::now);
    Reading::new(value, timestamp, trend)
}

/// Records every accepted event; optionally rejects pitches above a limit.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<NoteEvent>>,
    max_pitch: Option<i32>,
}

impl RecordingSink {
    pub fn rejecting_above(max_pitch: i32) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            max_pitch: Some(max_pitch),
        }
    }

    pub fn events(&self) -> Vec<NoteEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl NoteSink for RecordingSink {
    fn send(&self, event: NoteEvent) -> Result<()> {
        if let Some(max) = self.max_pitch {
            if event.pitch > max {
                return Err(anyhow!("pitch {} rejected", event.pitch));
            }
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }

    fn describe(&self) -> String {
        "recording sink".to_string()
    }
}

/// Hands out queued answers in order; once drained, keeps returning the
/// fallback reading.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Option<Reading>>>>,
    fallback: Option<Reading>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<Option<Reading>>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(reading: Reading) -> Self {
        Self {
            fallback: Some(reading),
            ..Self::new(Vec::new())
        }
    }

    /// Delays every answer, for exercising the fetch timeout.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ReadingProvider for ScriptedProvider {
    fn current_reading(&self) -> ProviderFuture<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()));
        let delay = self.delay;
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            next
        })
    }

    fn describe(&self) -> String {
        "scripted provider".to_string()
    }
}
