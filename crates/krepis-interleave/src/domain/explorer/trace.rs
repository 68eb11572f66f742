//! Decision traces
//!
//! The ordered decisions of one execution. Printed when a run fails and
//! stored as JSON checkpoints so that the failing interleaving can be
//! replayed with [`ReplayExplorer`](super::ReplayExplorer).

use crate::error::InterleaveResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// One decision: where it happened, what was offered, what was picked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    /// Decision label (acting thread and source location)
    pub label: String,
    /// Names of the offered threads, in offer order
    pub options: Vec<String>,
    /// Index of the chosen option
    pub choice: usize,
}

impl TraceStep {
    /// Name of the chosen thread
    pub fn chosen(&self) -> Option<&str> {
        self.options.get(self.choice).map(String::as_str)
    }
}

/// Decisions of one execution, root first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionTrace {
    /// Steps in the order they were taken
    pub steps: Vec<TraceStep>,
}

impl DecisionTrace {
    /// Number of decisions
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the execution made no decision
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Decision labels, root first
    pub fn labels(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.label.as_str()).collect()
    }

    /// Write the trace to `path` as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> InterleaveResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Read a trace written by [`save`](Self::save)
    pub fn load(path: impl AsRef<Path>) -> InterleaveResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl fmt::Display for DecisionTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "  (no decisions)");
        }
        for (index, step) in self.steps.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "  {:>3}. {} -> {} of [{}]",
                index + 1,
                step.label,
                step.chosen().unwrap_or("?"),
                step.options.join(", ")
            )?;
        }
        Ok(())
    }
}
