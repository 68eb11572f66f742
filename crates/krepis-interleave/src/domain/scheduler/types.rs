//! Scheduler outcome type

use crate::domain::thread::ThreadId;
use std::fmt;

/// What happens after an event has been applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// This thread is now RUNNING and must be woken if it is not the caller
    Resume(ThreadId),
    /// The acting thread keeps running; no decision was needed
    Continue,
    /// No registered thread remains
    Quiescent,
}

impl Schedule {
    /// Thread that runs next, if a new one was chosen
    pub fn resumed(&self) -> Option<&ThreadId> {
        match self {
            Schedule::Resume(thread) => Some(thread),
            _ => None,
        }
    }

    /// Whether every thread has terminated
    #[inline(always)]
    pub const fn is_quiescent(&self) -> bool {
        matches!(self, Schedule::Quiescent)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Resume(thread) => write!(f, "RESUME({})", thread),
            Schedule::Continue => write!(f, "CONTINUE"),
            Schedule::Quiescent => write!(f, "QUIESCENT"),
        }
    }
}
