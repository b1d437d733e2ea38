use std::sync::Mutex;

use anyhow::Result;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{Reading, Trend};

use super::{ProviderFuture, ReadingProvider};

const FLOOR: f64 = 40.0;
const CEILING: f64 = 300.0;
const START: f64 = 120.0;
/// Largest change between two samples, in mg/dL.
const MAX_STEP: f64 = 18.0;
/// Real sensors report every five minutes; rates below are per minute.
const SAMPLE_MINUTES: f64 = 5.0;
const GAP_PROBABILITY: f64 = 0.05;

struct WalkState {
    rng: StdRng,
    value: f64,
}

/// Offline stand-in for a sensor: a bounded random walk with an occasional
/// missing sample.
pub struct SimulatedProvider {
    state: Mutex<WalkState>,
}

impl SimulatedProvider {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            state: Mutex::new(WalkState { rng, value: START }),
        }
    }

    fn next_reading(&self) -> Option<Reading> {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if state.rng.gen_bool(GAP_PROBABILITY) {
            return None;
        }

        let step = state.rng.gen_range(-MAX_STEP..=MAX_STEP);
        let next = (state.value + step).clamp(FLOOR, CEILING);
        let rate = (next - state.value) / SAMPLE_MINUTES;
        state.value = next;

        Some(Reading::new(next.round(), Utc::now(), trend_for_rate(rate)))
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadingProvider for SimulatedProvider {
    fn current_reading(&self) -> ProviderFuture<'_> {
        let result: Result<Option<Reading>> = Ok(self.next_reading());
        Box::pin(async move { result })
    }

    fn describe(&self) -> String {
        "simulated random walk".to_string()
    }
}

/// Dexcom's trend bands, in mg/dL per minute.
fn trend_for_rate(rate: f64) -> Trend {
    match rate {
        r if r > 3.0 => Trend::RisingQuickly,
        r if r > 2.0 => Trend::Rising,
        r if r > 1.0 => Trend::RisingSlightly,
        r if r >= -1.0 => Trend::Steady,
        r if r >= -2.0 => Trend::FallingSlightly,
        r if r >= -3.0 => Trend::Falling,
        _ => Trend::FallingQuickly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_stays_in_bounds() {
        let provider = SimulatedProvider::with_seed(7);
        let mut seen = 0;
        for _ in 0..2_000 {
            if let Some(reading) = provider.next_reading() {
                assert!((FLOOR..=CEILING).contains(&reading.value));
                seen += 1;
            }
        }
        assert!(seen > 1_500);
    }

    #[test]
    fn same_seed_same_walk() {
        let a = SimulatedProvider::with_seed(42);
        let b = SimulatedProvider::with_seed(42);
        for _ in 0..50 {
            let left = a.next_reading().map(|r| (r.value, r.trend));
            let right = b.next_reading().map(|r| (r.value, r.trend));
            assert_eq!(left, right);
        }
    }

    #[test]
    fn rate_bands() {
        assert_eq!(trend_for_rate(3.5), Trend::RisingQuickly);
        assert_eq!(trend_for_rate(2.5), Trend::Rising);
        assert_eq!(trend_for_rate(1.5), Trend::RisingSlightly);
        assert_eq!(trend_for_rate(0.0), Trend::Steady);
        assert_eq!(trend_for_rate(-1.0), Trend::Steady);
        assert_eq!(trend_for_rate(-1.5), Trend::FallingSlightly);
        assert_eq!(trend_for_rate(-2.5), Trend::Falling);
        assert_eq!(trend_for_rate(-3.6), Trend::FallingQuickly);
    }

    #[tokio::test]
    async fn provider_trait_yields_readings() {
        let provider = SimulatedProvider::with_seed(3);
        let mut readings = 0;
        for _ in 0..20 {
            if provider.current_reading().await.unwrap().is_some() {
                readings += 1;
            }
        }
        assert!(readings > 0);
    }
}
