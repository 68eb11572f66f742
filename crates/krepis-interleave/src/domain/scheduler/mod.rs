//! Scheduler State
//!
//! Single source of truth for "what can happen next" in one execution.

pub mod state;
pub mod types;

pub use state::SchedulerState;
pub use types::Schedule;
