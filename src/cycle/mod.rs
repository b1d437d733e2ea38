pub mod poll_cycle;
pub mod report;

pub use poll_cycle::{CycleOutcome, CycleTiming, PollCycle, Reporter};
pub use report::CycleReport;
