use std::time::Duration;

use thiserror::Error;

/// Why a single poll cycle failed. None of these stop the scheduler.
///
/// A missing reading is not an error: it is reported as
/// [`CycleOutcome::Skipped`](crate::cycle::CycleOutcome::Skipped).
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("unrecognized trend label '{0}'")]
    UnrecognizedTrend(String),

    #[error("reading provider failed: {0:#}")]
    Provider(anyhow::Error),

    #[error("reading provider did not answer within {0:?}")]
    ProviderTimeout(Duration),

    #[error("sound sink rejected events: {0:#}")]
    Sink(anyhow::Error),
}

impl CycleError {
    pub fn kind(&self) -> &'static str {
        match self {
            CycleError::UnrecognizedTrend(_) => "unrecognized_trend",
            CycleError::Provider(_) => "provider",
            CycleError::ProviderTimeout(_) => "provider_timeout",
            CycleError::Sink(_) => "sink",
        }
    }
}
