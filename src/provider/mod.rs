pub mod dexcom;
pub mod simulated;

pub use dexcom::{DexcomShareClient, Region};
pub use simulated::SimulatedProvider;

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;

use crate::models::Reading;

pub type ProviderFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<Reading>>> + Send + 'a>>;

/// Source of the current glucose reading.
///
/// `Ok(None)` means the source answered but has no current value; the cycle
/// is skipped. A label outside the known trend set should surface as
/// [`CycleError::UnrecognizedTrend`](crate::error::CycleError) inside the
/// returned error so the cycle can report it as such.
pub trait ReadingProvider: Send + Sync {
    fn current_reading(&self) -> ProviderFuture<'_>;

    fn describe(&self) -> String;
}
