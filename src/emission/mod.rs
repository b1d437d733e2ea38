pub mod event_log;
pub mod sequencer;

pub use event_log::EventLog;
pub use sequencer::{Emission, EmissionSequencer};
