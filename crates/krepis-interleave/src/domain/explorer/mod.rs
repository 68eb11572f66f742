//! # State-Space Exploration
//!
//! The scheduler asks a [`DecisionSource`] which thread proceeds whenever
//! two or more could. An [`Explorer`] is a decision source that remembers,
//! across executions of the same test, which decision sequences were tried.
//!
//! ```text
//! run 1:  decide ─> decide ─> done()     (leaf marked complete)
//! run 2:  decide ─> decide ─> done()     (next open leaf)
//!   ...
//! is_completely_tested() == true
//! ```
//!
//! - `tree`: arena of decision points
//! - `dfs`: exhaustive depth-first strategy
//! - `replay`: one execution from a recorded trace
//! - `trace`: serializable decision path

pub mod dfs;
pub mod replay;
pub mod trace;
pub mod tree;

pub use dfs::{DepthFirstExplorer, END_OF_EXECUTION};
pub use replay::ReplayExplorer;
pub use trace::{DecisionTrace, TraceStep};
pub use tree::{DecisionNode, DecisionTree, NodeId, NodeStatus};

use crate::domain::thread::ThreadId;
use crate::error::InterleaveResult;
use parking_lot::Mutex;
use std::sync::Arc;

/// Supplier of scheduling decisions
pub trait DecisionSource {
    /// Pick one of `options` (at least two, in lineage order) at the
    /// decision point described by `label`
    fn decide(&mut self, label: &str, options: &[ThreadId]) -> InterleaveResult<ThreadId>;
}

/// Decision source that tracks coverage across executions
pub trait Explorer: DecisionSource + Send {
    /// The current execution ended; rewind for the next one
    ///
    /// Returns any error deferred while deciding.
    fn done(&mut self) -> InterleaveResult<()>;

    /// Whether no untried execution remains
    fn is_completely_tested(&self) -> bool;

    /// Decisions taken by the current execution so far
    fn trace(&self) -> DecisionTrace;

    /// Advisory number of executions needed; not exact
    fn estimate_iterations(&self) -> u64;
}

impl<D: DecisionSource + ?Sized> DecisionSource for Arc<Mutex<D>> {
    fn decide(&mut self, label: &str, options: &[ThreadId]) -> InterleaveResult<ThreadId> {
        self.lock().decide(label, options)
    }
}

impl<D: DecisionSource + ?Sized> DecisionSource for Box<D> {
    fn decide(&mut self, label: &str, options: &[ThreadId]) -> InterleaveResult<ThreadId> {
        (**self).decide(label, options)
    }
}
