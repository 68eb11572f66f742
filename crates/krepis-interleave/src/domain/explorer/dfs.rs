//! Depth-first exploration
//!
//! Every execution walks from the root to the first child that is not yet
//! completely tested. The leaf where an execution ends is marked complete by
//! `done()`, which also rewinds to the root, so consecutive executions visit
//! the leaves of the tree left to right and never repeat a path.
//!
//! A node where one execution decided and another one ended (or the other
//! way round) is nondeterminism like any other label or option mismatch.
//!
//! Errors raised while deciding (a decision point offering different options
//! than before) are not returned from `decide`: the scheduler may be in the
//! middle of handling a signal or park and must not unwind half-way. They are
//! kept and returned from the next `done()`; until then every decision falls
//! back to the first option.

use super::trace::{DecisionTrace, TraceStep};
use super::tree::{DecisionTree, NodeId};
use super::{DecisionSource, Explorer};
use crate::domain::thread::ThreadId;
use crate::error::{InterleaveError, InterleaveResult};
use tracing::{debug, warn};

/// Label recorded where an execution ended
pub const END_OF_EXECUTION: &str = "end of execution";

/// Exhaustive depth-first explorer
#[derive(Debug, Default)]
pub struct DepthFirstExplorer {
    tree: DecisionTree,
    current: NodeId,
    deferred: Option<InterleaveError>,
    runs: usize,
}

impl DepthFirstExplorer {
    /// Explorer with an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Executions finished so far
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// The decision tree built so far
    pub fn tree(&self) -> &DecisionTree {
        &self.tree
    }

    fn advance(&mut self, label: &str, options: &[ThreadId]) -> InterleaveResult<ThreadId> {
        self.tree.visit(self.current, label, options)?;

        let node = self.tree.node(self.current);
        let (index, child) = self
            .tree
            .first_open_child(self.current)
            .or_else(|| node.children.first().map(|child| (0, *child)))
            .ok_or_else(|| no_options(self.tree.depth(self.current)))?;
        let chosen = options
            .get(index)
            .cloned()
            .ok_or_else(|| no_options(self.tree.depth(self.current)))?;

        self.current = child;
        Ok(chosen)
    }
}

impl DecisionSource for DepthFirstExplorer {
    fn decide(&mut self, label: &str, options: &[ThreadId]) -> InterleaveResult<ThreadId> {
        let fallback = options
            .first()
            .cloned()
            .ok_or_else(|| no_options(self.tree.depth(self.current)))?;
        if self.deferred.is_some() {
            return Ok(fallback);
        }

        match self.advance(label, options) {
            Ok(chosen) => Ok(chosen),
            Err(err) => {
                warn!("⚠️ Deferring explorer error until the run ends: {}", err);
                self.deferred = Some(err);
                Ok(fallback)
            }
        }
    }
}

impl Explorer for DepthFirstExplorer {
    fn done(&mut self) -> InterleaveResult<()> {
        // the end of an execution is a decision point without options: it
        // completes a fresh leaf and contradicts a node that offered choices
        let ended = self.tree.visit(self.current, END_OF_EXECUTION, &[]);
        self.runs += 1;
        debug!(
            "🌳 run {} finished at depth {} ({} nodes)",
            self.runs,
            self.tree.depth(self.current),
            self.tree.len()
        );
        self.current = NodeId::ROOT;

        match self.deferred.take() {
            Some(err) => Err(err),
            None => ended,
        }
    }

    fn is_completely_tested(&self) -> bool {
        self.tree.is_completely_tested()
    }

    fn trace(&self) -> DecisionTrace {
        let path = self.tree.path(self.current);
        let steps = path
            .windows(2)
            .filter_map(|pair| {
                let parent = self.tree.node(pair[0]);
                let choice = parent.children.iter().position(|child| *child == pair[1])?;
                Some(TraceStep {
                    label: parent.label.clone().unwrap_or_default(),
                    options: parent.options.iter().map(ToString::to_string).collect(),
                    choice,
                })
            })
            .collect();
        DecisionTrace { steps }
    }

    fn estimate_iterations(&self) -> u64 {
        let mut estimate: u64 = 1;
        let mut cursor = NodeId::ROOT;
        loop {
            let node = self.tree.node(cursor);
            match node.children.first() {
                Some(first) => {
                    estimate = estimate.saturating_mul(node.children.len() as u64);
                    cursor = *first;
                }
                None => return estimate,
            }
        }
    }
}

fn no_options(depth: usize) -> InterleaveError {
    InterleaveError::NondeterministicExecution {
        depth,
        expected: "at least one option".to_string(),
        found: "none".to_string(),
    }
}
