//! # Exploration Harness
//!
//! Runs a test closure again and again, each time under a fresh
//! [`Scheduler`] that asks the explorer for its decisions, until the
//! explorer reports that every interleaving has been executed.
//!
//! ```text
//! loop {
//!     scheduler = Scheduler::new(explorer)
//!     run test on the root thread      (spawned threads join the run)
//!     finish: wait for every thread    (or the first failure)
//!     explorer.done()                  (branch recorded even on failure)
//!     failure?            -> print trace, checkpoint, Err(Failure)
//!     completely tested?  -> Ok(Report)
//! }
//! ```

use crate::config::InterleaveConfig;
use crate::domain::explorer::{DecisionTrace, DepthFirstExplorer, Explorer, ReplayExplorer};
use crate::domain::thread::ROOT_THREAD_NAME;
use crate::error::{InterleaveError, InterleaveResult};
use crate::infrastructure::context::{self, is_abort, panic_message, ExecutionContext};
use crate::infrastructure::gate::Scheduler;
use crate::infrastructure::sink::ConcurrencyEventSink;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outcome of an exploration that found no failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Executions performed
    pub iterations: usize,
    /// Whether every interleaving was executed
    pub complete: bool,
    /// Explorer's advisory estimate of the total
    pub estimated_iterations: u64,
}

/// A failing execution
#[derive(Debug, Clone, thiserror::Error)]
#[error("{error}\n  in execution {iteration}, decision trace:\n{trace}")]
pub struct Failure {
    /// What went wrong
    pub error: InterleaveError,
    /// Decisions of the failing execution
    pub trace: DecisionTrace,
    /// 1-based number of the failing execution
    pub iteration: usize,
}

/// Drives repeated executions of a test
pub struct Harness<E: Explorer = DepthFirstExplorer> {
    config: InterleaveConfig,
    explorer: Arc<Mutex<E>>,
}

impl Harness<DepthFirstExplorer> {
    /// Exhaustive harness configured from the environment
    pub fn new() -> Self {
        Self::with_config(InterleaveConfig::from_env())
    }

    /// Exhaustive harness with an explicit configuration
    pub fn with_config(config: InterleaveConfig) -> Self {
        Self::with_explorer(DepthFirstExplorer::new(), config)
    }
}

impl Default for Harness<DepthFirstExplorer> {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness<ReplayExplorer> {
    /// Harness that runs the test once along `trace`
    pub fn replay(trace: DecisionTrace, config: InterleaveConfig) -> Self {
        Self::with_explorer(ReplayExplorer::new(trace), config)
    }

    /// Harness that replays a checkpoint written by a failing run
    pub fn replay_file(path: impl AsRef<Path>, config: InterleaveConfig) -> InterleaveResult<Self> {
        let trace = DecisionTrace::load(path.as_ref())?;
        info!("📂 Replaying {} decisions from {}", trace.len(), path.as_ref().display());
        Ok(Self::replay(trace, config))
    }
}

impl<E: Explorer + 'static> Harness<E> {
    /// Harness around any explorer
    pub fn with_explorer(explorer: E, config: InterleaveConfig) -> Self {
        let config = if config.is_valid() {
            config
        } else {
            warn!("⚠️ Invalid interleave config {:?}, using defaults", config);
            InterleaveConfig::default()
        };
        Self {
            config,
            explorer: Arc::new(Mutex::new(explorer)),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &InterleaveConfig {
        &self.config
    }

    /// Run `test` under every interleaving the explorer produces
    ///
    /// Stops at the first failing execution, returning its error and trace.
    /// Threads of the test must be created with [`crate::thread::spawn`] and
    /// synchronize through [`crate::sync`] primitives.
    pub fn check<F>(&mut self, test: F) -> Result<Report, Failure>
    where
        F: Fn(),
    {
        let mut iterations = 0;
        loop {
            if let Some(max) = self.config.max_iterations {
                if iterations >= max {
                    let estimated = self.explorer.lock().estimate_iterations();
                    warn!(
                        "⚠️ Stopping after {} executions, exploration incomplete (estimated {})",
                        iterations, estimated
                    );
                    return Ok(Report {
                        iterations,
                        complete: false,
                        estimated_iterations: estimated,
                    });
                }
            }
            iterations += 1;

            let outcome = self.execute(&test);
            let (trace, done) = {
                let mut explorer = self.explorer.lock();
                (explorer.trace(), explorer.done())
            };

            // a deferred explorer error invalidates whatever the run observed
            if let Some(error) = done.err().or(outcome) {
                return Err(self.fail(error, trace, iterations));
            }
            debug!("✅ execution {} passed with {} decisions", iterations, trace.len());

            let explorer = self.explorer.lock();
            if explorer.is_completely_tested() {
                info!("🎯 All interleavings explored in {} executions", iterations);
                return Ok(Report {
                    iterations,
                    complete: true,
                    estimated_iterations: explorer.estimate_iterations(),
                });
            }
        }
    }

    /// One execution; returns its failure, if any
    fn execute<F: Fn()>(&self, test: &F) -> Option<InterleaveError> {
        let scheduler = Arc::new(Scheduler::new(self.explorer.clone(), self.config.max_decisions));
        let cx = ExecutionContext::new(scheduler.clone());
        {
            let _entered = context::enter(cx.clone());
            scheduler.begin();

            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(test)) {
                if !is_abort(payload.as_ref()) {
                    scheduler.abort(InterleaveError::TestPanicked {
                        thread: ROOT_THREAD_NAME.to_string(),
                        message: panic_message(payload.as_ref()),
                    });
                }
            }
            // the failure, if any, is read back below
            let _ = scheduler.finish();
        }
        cx.join_hosts();
        scheduler.failure()
    }

    fn fail(&self, error: InterleaveError, trace: DecisionTrace, iteration: usize) -> Failure {
        error!("❌ Execution {} failed: {}", iteration, error);
        if self.config.print_trace {
            eprintln!("krepis-interleave: execution {} failed: {}", iteration, error);
            eprintln!("decision trace:\n{}", trace);
        }
        if let Some(path) = &self.config.checkpoint_file {
            match trace.save(path) {
                Ok(()) => info!("💾 Failing trace written to {}", path.display()),
                Err(err) => warn!("⚠️ Could not write checkpoint {}: {}", path.display(), err),
            }
        }
        Failure {
            error,
            trace,
            iteration,
        }
    }
}

/// Explore `test` exhaustively with the environment's configuration
///
/// # Panics
///
/// Panics with the error and decision trace of the first failing execution.
///
/// # Example
///
/// ```rust
/// use krepis_interleave::{model, sync::Mutex, thread};
/// use std::sync::Arc;
///
/// model(|| {
///     let counter = Arc::new(Mutex::new(0));
///     let other = counter.clone();
///     let handle = thread::spawn(move || *other.lock() += 1);
///     *counter.lock() += 1;
///     handle.join().unwrap();
///     assert_eq!(*counter.lock(), 2);
/// });
/// ```
pub fn model<F: Fn()>(test: F) {
    if let Err(failure) = Harness::new().check(test) {
        panic!("{}", failure);
    }
}
