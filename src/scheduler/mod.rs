pub mod controller;
pub mod loop_worker;
pub mod state;

pub use controller::Scheduler;
pub use state::{ScheduleStats, ScheduleSummary};
