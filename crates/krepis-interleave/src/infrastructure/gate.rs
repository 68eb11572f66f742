//! # Scheduler Gate
//!
//! Thread-safe shell around [`SchedulerState`]. Host threads call in
//! concurrently; the gate lets exactly one of them execute test code.
//!
//! # Design
//!
//! ```text
//!   host thread ──> lock(gate) ──> SchedulerState::op()
//!                                      │
//!                  Resume(other) ──────┼──> notify other's Condvar
//!                  Quiescent ──────────┼──> notify idle Condvar
//!                  Err(e) ─────────────┴──> record failure, wake everyone
//!                                      │
//!        wait on own Condvar until RUNNING (or failed) <──┘
//! ```
//!
//! One `parking_lot::Mutex` guards all scheduling state. Each registered
//! thread has its own `Condvar`, created when the thread is announced so a
//! wakeup issued before the host thread exists is never lost: the waiter
//! re-checks its run state under the lock before sleeping.

use crate::domain::explorer::DecisionSource;
use crate::domain::scheduler::{Schedule, SchedulerState};
use crate::domain::sync::LockId;
use crate::domain::thread::ThreadId;
use crate::error::{InterleaveError, InterleaveResult};
use crate::infrastructure::sink::ConcurrencyEventSink;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::HashMap;
use std::panic::Location;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error};

/// Host thread handle used by the gate
pub type HostThreadId = thread::ThreadId;

struct GateState<D: DecisionSource> {
    state: SchedulerState<HostThreadId, D>,
    signals: HashMap<ThreadId, Arc<Condvar>>,
    failure: Option<InterleaveError>,
}

impl<D: DecisionSource> GateState<D> {
    fn wake(&self, schedule: &Schedule, idle: &Condvar) {
        match schedule {
            Schedule::Resume(next) => {
                if let Some(signal) = self.signals.get(next) {
                    signal.notify_one();
                }
            }
            Schedule::Quiescent => {
                idle.notify_all();
            }
            Schedule::Continue => {}
        }
    }

    fn fail(&mut self, err: InterleaveError, idle: &Condvar) {
        if self.failure.is_none() {
            if !matches!(err, InterleaveError::Aborted) {
                error!("❌ Execution failed: {}", err);
            }
            self.failure = Some(err);
        }
        for signal in self.signals.values() {
            signal.notify_all();
        }
        idle.notify_all();
    }

    fn me(&self) -> InterleaveResult<ThreadId> {
        self.state.id_for(&thread::current().id())
    }

    /// Like [`me`](Self::me), but an untracked caller fails the execution
    fn me_or_fail(&mut self, idle: &Condvar) -> InterleaveResult<ThreadId> {
        self.me().inspect_err(|err| self.fail(err.clone(), idle))
    }
}

/// Concurrency gate of one execution
pub struct Scheduler<D: DecisionSource> {
    inner: Mutex<GateState<D>>,
    idle: Condvar,
}

impl<D: DecisionSource + Send> Scheduler<D> {
    /// Gate over a fresh execution model
    pub fn new(source: D, max_decisions: usize) -> Self {
        Self {
            inner: Mutex::new(GateState {
                state: SchedulerState::new(source, max_decisions),
                signals: HashMap::new(),
                failure: None,
            }),
            idle: Condvar::new(),
        }
    }

    /// Register the calling host thread as the root
    pub fn begin(&self) -> ThreadId {
        let mut gate = self.inner.lock();
        let root = gate.state.begin(thread::current().id());
        gate.signals.insert(root.clone(), Arc::new(Condvar::new()));
        root
    }

    /// The root's test closure returned: terminate the root and wait until
    /// every other thread finished or the execution failed
    pub fn finish(&self) -> InterleaveResult<()> {
        let mut gate = self.inner.lock();
        if gate.failure.is_none() {
            match gate.me() {
                Ok(root) => {
                    gate.signals.remove(&root);
                    match gate.state.thread_terminated(&root) {
                        Ok(schedule) => gate.wake(&schedule, &self.idle),
                        Err(err) => gate.fail(err, &self.idle),
                    }
                }
                Err(err) => gate.fail(err, &self.idle),
            }
        }

        while gate.failure.is_none() && !gate.state.is_quiescent() {
            self.idle.wait(&mut gate);
        }
        match &gate.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// First failure recorded in this execution
    pub fn failure(&self) -> Option<InterleaveError> {
        self.inner.lock().failure.clone()
    }

    /// Number of RUNNING threads; 0 or 1 at every instant
    pub fn running_count(&self) -> usize {
        self.inner.lock().state.running_count()
    }

    /// Explorer consultations so far
    pub fn decisions(&self) -> usize {
        self.inner.lock().state.decisions()
    }

    /// Alias of [`ConcurrencyEventSink::thread_exit`]
    pub fn before_thread_exit(&self) -> InterleaveResult<()> {
        self.thread_exit()
    }

    /// Apply `op` for the calling thread, then block until it may run
    fn dispatch<F>(&self, op: F) -> InterleaveResult<()>
    where
        F: FnOnce(&mut SchedulerState<HostThreadId, D>, &ThreadId) -> InterleaveResult<Schedule>,
    {
        let mut gate = self.inner.lock();
        if gate.failure.is_some() {
            return Err(InterleaveError::Aborted);
        }
        let me = match gate.me() {
            Ok(me) => me,
            Err(err) => {
                gate.fail(err.clone(), &self.idle);
                return Err(err);
            }
        };

        match op(&mut gate.state, &me) {
            Ok(schedule) => gate.wake(&schedule, &self.idle),
            Err(err) => {
                gate.fail(err.clone(), &self.idle);
                return Err(err);
            }
        }
        self.await_turn(&mut gate, &me)
    }

    fn await_turn(&self, gate: &mut MutexGuard<'_, GateState<D>>, me: &ThreadId) -> InterleaveResult<()> {
        let signal = gate
            .signals
            .get(me)
            .cloned()
            .ok_or_else(|| InterleaveError::UntrackedThread(me.to_string()))?;
        loop {
            if gate.failure.is_some() {
                return Err(InterleaveError::Aborted);
            }
            if gate.state.is_running(me) {
                return Ok(());
            }
            signal.wait(gate);
        }
    }
}

impl<D: DecisionSource + Send> ConcurrencyEventSink for Scheduler<D> {
    fn thread_start(&self) -> InterleaveResult<ThreadId> {
        let mut gate = self.inner.lock();
        if gate.failure.is_some() {
            return Err(InterleaveError::Aborted);
        }
        let parent = gate.me_or_fail(&self.idle)?;
        let child = match gate.state.new_thread(&parent) {
            Ok(child) => child,
            Err(err) => {
                gate.fail(err.clone(), &self.idle);
                return Err(err);
            }
        };
        gate.signals.insert(child.clone(), Arc::new(Condvar::new()));
        Ok(child)
    }

    fn thread_started(&self, thread: &ThreadId) -> InterleaveResult<()> {
        let mut gate = self.inner.lock();
        if gate.failure.is_some() {
            return Err(InterleaveError::Aborted);
        }
        if let Err(err) = gate.state.bind(thread::current().id(), thread) {
            gate.fail(err.clone(), &self.idle);
            return Err(err);
        }
        debug!("🧵 {} bound to host thread", thread);
        self.await_turn(&mut gate, thread)
    }

    fn thread_exit(&self) -> InterleaveResult<()> {
        let mut gate = self.inner.lock();
        if gate.failure.is_some() {
            return Err(InterleaveError::Aborted);
        }
        let me = gate.me_or_fail(&self.idle)?;
        gate.signals.remove(&me);
        match gate.state.thread_terminated(&me) {
            Ok(schedule) => {
                gate.wake(&schedule, &self.idle);
                Ok(())
            }
            Err(err) => {
                gate.fail(err.clone(), &self.idle);
                Err(err)
            }
        }
    }

    fn monitor_enter(&self, lock: LockId) -> InterleaveResult<()> {
        self.dispatch(|state, me| state.monitor_enter(me, lock))
    }

    fn monitor_exit(&self, lock: LockId) -> InterleaveResult<()> {
        self.dispatch(|state, me| state.monitor_exit(me, lock))
    }

    fn wait(&self, lock: LockId, timeout: Option<Duration>) -> InterleaveResult<()> {
        self.dispatch(|state, me| state.wait(me, lock, timeout))
    }

    fn signal_one(&self, lock: LockId) -> InterleaveResult<()> {
        self.dispatch(|state, me| state.notify(me, lock))
    }

    fn signal_all(&self, lock: LockId) -> InterleaveResult<()> {
        self.dispatch(|state, me| state.notify_all(me, lock))
    }

    fn park(&self) -> InterleaveResult<()> {
        self.dispatch(|state, me| state.park(me))
    }

    fn unpark(&self, thread: &ThreadId) -> InterleaveResult<()> {
        self.dispatch(|state, me| state.unpark(me, thread))
    }

    fn join(&self, thread: &ThreadId, timeout: Option<Duration>) -> InterleaveResult<()> {
        self.dispatch(|state, me| state.join(me, thread, timeout))
    }

    fn interrupt(&self, thread: &ThreadId) -> InterleaveResult<()> {
        self.dispatch(|state, me| state.interrupt(me, thread))
    }

    fn interrupted(&self, clear: bool) -> InterleaveResult<bool> {
        let mut gate = self.inner.lock();
        if gate.failure.is_some() {
            return Err(InterleaveError::Aborted);
        }
        let me = gate.me_or_fail(&self.idle)?;
        let flag = gate.state.interrupted(&me, clear);
        flag.inspect_err(|err| gate.fail(err.clone(), &self.idle))
    }

    fn yield_point(&self, location: &'static Location<'static>) -> InterleaveResult<()> {
        self.dispatch(|state, me| state.yield_point(me, location))
    }

    fn current(&self) -> InterleaveResult<ThreadId> {
        self.inner.lock().me_or_fail(&self.idle)
    }

    fn abort(&self, error: InterleaveError) {
        self.inner.lock().fail(error, &self.idle);
    }
}
