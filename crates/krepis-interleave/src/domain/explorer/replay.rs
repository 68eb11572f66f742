//! Replay of a recorded trace
//!
//! Drives exactly one execution along the decisions of a [`DecisionTrace`].
//! Any mismatch between the recorded steps and what the program offers is a
//! [`InterleaveError::ReplayDiverged`], deferred to `done()` like the
//! depth-first explorer does.

use super::trace::DecisionTrace;
use super::{DecisionSource, Explorer};
use crate::domain::thread::ThreadId;
use crate::error::{InterleaveError, InterleaveResult};
use tracing::warn;

/// Explorer that repeats one recorded execution
#[derive(Debug)]
pub struct ReplayExplorer {
    recorded: DecisionTrace,
    step: usize,
    finished: bool,
    deferred: Option<InterleaveError>,
}

impl ReplayExplorer {
    /// Replay `recorded`
    pub fn new(recorded: DecisionTrace) -> Self {
        Self {
            recorded,
            step: 0,
            finished: false,
            deferred: None,
        }
    }

    fn follow(&self, label: &str, options: &[ThreadId]) -> InterleaveResult<ThreadId> {
        let diverged = |reason: String| InterleaveError::ReplayDiverged {
            step: self.step,
            reason,
        };

        let step = self.recorded.steps.get(self.step).ok_or_else(|| {
            diverged(format!("decision at \"{}\" past the end of the trace", label))
        })?;
        if step.label != label {
            return Err(diverged(format!(
                "label \"{}\" does not match recorded \"{}\"",
                label, step.label
            )));
        }

        let names: Vec<String> = options.iter().map(ToString::to_string).collect();
        if names != step.options {
            return Err(diverged(format!(
                "options [{}] do not match recorded [{}]",
                names.join(", "),
                step.options.join(", ")
            )));
        }

        options
            .get(step.choice)
            .cloned()
            .ok_or_else(|| diverged(format!("recorded choice {} is out of range", step.choice)))
    }
}

impl DecisionSource for ReplayExplorer {
    fn decide(&mut self, label: &str, options: &[ThreadId]) -> InterleaveResult<ThreadId> {
        let fallback = options.first().cloned().ok_or_else(|| InterleaveError::ReplayDiverged {
            step: self.step,
            reason: "no options offered".to_string(),
        })?;
        if self.deferred.is_some() {
            return Ok(fallback);
        }

        match self.follow(label, options) {
            Ok(chosen) => {
                self.step += 1;
                Ok(chosen)
            }
            Err(err) => {
                warn!("⚠️ Replay diverged: {}", err);
                self.deferred = Some(err);
                Ok(fallback)
            }
        }
    }
}

impl Explorer for ReplayExplorer {
    fn done(&mut self) -> InterleaveResult<()> {
        self.finished = true;
        let taken = std::mem::take(&mut self.step);

        if let Some(err) = self.deferred.take() {
            return Err(err);
        }
        if taken < self.recorded.len() {
            return Err(InterleaveError::ReplayDiverged {
                step: taken,
                reason: format!(
                    "execution ended after {} of {} recorded decisions",
                    taken,
                    self.recorded.len()
                ),
            });
        }
        Ok(())
    }

    fn is_completely_tested(&self) -> bool {
        self.finished
    }

    fn trace(&self) -> DecisionTrace {
        DecisionTrace {
            steps: self.recorded.steps[..self.step].to_vec(),
        }
    }

    fn estimate_iterations(&self) -> u64 {
        1
    }
}
