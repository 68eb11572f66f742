//! Krepis Interleave - Deterministic Concurrency Explorer
//!
//! # Overview
//!
//! `krepis-interleave` runs a multi-threaded test again and again while
//! controlling which thread proceeds at every scheduling-relevant operation
//! (lock acquire/release, wait/notify, park, spawn, exit, join). Every
//! distinct interleaving is executed exactly once, so races that depend on
//! thread ordering show up deterministically instead of by luck.
//!
//! # Trinity Architecture
//!
//! - **Domain**: the single-threaded model ([`domain::thread`],
//!   [`domain::sync`], [`domain::scheduler`], [`domain::explorer`])
//! - **Infrastructure**: the event feed, the thread-safe gate and the
//!   per-thread execution context
//! - **Adapters**: cooperative [`thread`] and [`sync`] primitives for tests
//!
//! # Execution Laws (Invariants)
//!
//! - At most one registered thread is RUNNING at any instant
//! - The same decision point offers the same label and options in every
//!   execution, otherwise the run fails as nondeterministic
//! - No decision sequence is executed twice; exploration ends when the
//!   decision tree is completely tested
//!
//! # Usage
//!
//! ```rust
//! use krepis_interleave::{thread, Harness, InterleaveConfig};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let mut harness = Harness::with_config(InterleaveConfig::default().with_print_trace(false));
//! let failure = harness
//!     .check(|| {
//!         let counter = Arc::new(AtomicUsize::new(0));
//!         let handles: Vec<_> = (0..2)
//!             .map(|_| {
//!                 let counter = counter.clone();
//!                 thread::spawn(move || {
//!                     let seen = counter.load(Ordering::SeqCst);
//!                     thread::yield_now();
//!                     counter.store(seen + 1, Ordering::SeqCst);
//!                 })
//!             })
//!             .collect();
//!         for handle in handles {
//!             handle.join().unwrap();
//!         }
//!         assert_eq!(counter.load(Ordering::SeqCst), 2, "lost update");
//!     })
//!     .unwrap_err();
//!
//! assert!(failure.to_string().contains("lost update"));
//! ```
//!
//! # Configuration
//!
//! See [`InterleaveConfig`] for the `KREPIS_INTERLEAVE_*` environment
//! variables read by [`Harness::new`] and [`model`].

#![warn(missing_docs)]
#![warn(clippy::all)]

// Trinity Architecture Layers
pub mod adapters;
pub mod domain;
pub mod infrastructure;

pub mod config;
pub mod error;
pub mod harness;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Re-export Primary Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

// Cooperative primitives
pub use adapters::{sync, thread};

// Thread model
pub use domain::thread::{BlockReason, RunState, ThreadId, ThreadRegistry, ThreadStates};

// Synchronization model
pub use domain::sync::{JoinTracker, LockId, Monitor, SynchronizationTracker, Transition};

// Scheduling
pub use domain::scheduler::{Schedule, SchedulerState};
pub use infrastructure::{ConcurrencyEventSink, ExecutionContext, Scheduler};

// Exploration
pub use domain::explorer::{
    DecisionSource, DecisionTrace, DecisionTree, DepthFirstExplorer, Explorer, ReplayExplorer,
    TraceStep,
};

// Harness, configuration, errors
pub use config::InterleaveConfig;
pub use error::{BlockedThread, InterleaveError, InterleaveResult};
pub use harness::{model, Failure, Harness, Report};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
