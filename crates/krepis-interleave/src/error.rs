//! # Interleaving Error Types
//!
//! Every fallible engine operation returns [`InterleaveResult`]. The variants
//! are grouped by how a failure must be handled:
//!
//! - **Contract violations** are never retried. They mean the test or the
//!   event producer broke an assumption the model relies on.
//! - **Run failures** end the current execution and are reported to the
//!   harness caller together with the decision trace.
//! - **Control** variants unwind secondary threads once a primary failure
//!   has been recorded.

use crate::domain::sync::LockId;
use crate::domain::thread::{BlockReason, ThreadId};
use std::fmt;

/// A thread that could not make progress when an execution stalled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedThread {
    /// The stalled thread
    pub thread: ThreadId,
    /// What the thread was waiting for, if known
    pub reason: Option<BlockReason>,
    /// Last source location the thread reported
    pub location: Option<String>,
}

impl fmt::Display for BlockedThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.thread)?;
        if let Some(reason) = &self.reason {
            write!(f, " blocked on {}", reason)?;
        }
        if let Some(location) = &self.location {
            write!(f, " (last seen at {})", location)?;
        }
        Ok(())
    }
}

fn list(threads: &[BlockedThread]) -> String {
    threads
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Engine Errors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Errors raised by the scheduling and exploration engine
#[derive(Debug, Clone, thiserror::Error)]
pub enum InterleaveError {
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Contract Violations
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// An event was reported for a thread that was never registered
    #[error("Untracked thread: {0}")]
    UntrackedThread(String),

    /// `wait`/`notify`/`exit` on a monitor the thread does not own
    #[error("Illegal monitor state: {thread} does not hold {lock}")]
    IllegalMonitorState {
        /// Offending thread
        thread: ThreadId,
        /// Monitor it tried to use
        lock: LockId,
    },

    /// The same decision point offered different options or labels
    #[error("Nondeterministic execution at decision {depth}: expected {expected}, found {found}")]
    NondeterministicExecution {
        /// Distance of the decision point from the root
        depth: usize,
        /// What the first visit recorded
        expected: String,
        /// What this visit offered
        found: String,
    },

    /// A replayed execution no longer matches its recorded trace
    #[error("Replay diverged at step {step}: {reason}")]
    ReplayDiverged {
        /// Index of the diverging decision
        step: usize,
        /// Human-readable mismatch description
        reason: String,
    },

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Run Failures
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// No thread can run while some threads are still blocked
    #[error("Deadlock detected: {}", list(.blocked))]
    Deadlock {
        /// Every blocked thread with its last known state
        blocked: Vec<BlockedThread>,
    },

    /// The test closure returned but spawned threads could not reach their exit
    #[error("Dangling threads never reached their exit: {}", list(.threads))]
    DanglingThreads {
        /// Threads left behind
        threads: Vec<BlockedThread>,
    },

    /// The test itself panicked (assertion failure or explicit panic)
    #[error("Test panicked on {thread}: {message}")]
    TestPanicked {
        /// Name of the panicking thread
        thread: String,
        /// Panic payload rendered as text
        message: String,
    },

    /// A single execution made more decisions than configured
    #[error("Decision limit of {limit} exceeded in a single execution")]
    DecisionLimitExceeded {
        /// Configured per-execution bound
        limit: usize,
    },

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Control & I/O
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Another thread already failed the execution
    #[error("Execution aborted after a failure on another thread")]
    Aborted,

    /// Reading or writing a trace checkpoint failed
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),
}

impl InterleaveError {
    /// Contract violations indicate a broken model assumption, never a test bug
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::UntrackedThread(_)
                | Self::IllegalMonitorState { .. }
                | Self::NondeterministicExecution { .. }
                | Self::ReplayDiverged { .. }
        )
    }

    /// Whether this error describes the test program rather than the engine
    pub fn is_test_failure(&self) -> bool {
        matches!(
            self,
            Self::Deadlock { .. } | Self::DanglingThreads { .. } | Self::TestPanicked { .. }
        )
    }
}

impl From<std::io::Error> for InterleaveError {
    fn from(err: std::io::Error) -> Self {
        Self::Checkpoint(err.to_string())
    }
}

impl From<serde_json::Error> for InterleaveError {
    fn from(err: serde_json::Error) -> Self {
        Self::Checkpoint(err.to_string())
    }
}

/// Result alias used across the crate
pub type InterleaveResult<T> = Result<T, InterleaveError>;
