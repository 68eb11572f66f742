//! # Scheduler State
//!
//! Composes the thread registry, run states, monitor tracker and join
//! tracker into one model of an execution. There is one method per event
//! kind. Every method:
//!
//! 1. validates that the acting thread is registered (fails fast with
//!    [`InterleaveError::UntrackedThread`] otherwise),
//! 2. updates the sub-trackers,
//! 3. returns a [`Schedule`]: the thread to resume, `Continue` when the
//!    acting thread keeps running, or `Quiescent` once nothing is left.
//!
//! # Decisions
//!
//! ```text
//! RUNNABLE set after the event
//!   0 threads ─> Quiescent | Deadlock | DanglingThreads
//!   1 thread  ─> resumed, explorer not consulted
//!   2+        ─> explorer.decide(label, runnable)
//! ```
//!
//! The label is the acting thread plus its last reported source location,
//! so the same decision point carries the same label in every execution.
//!
//! This type is not thread-safe; the gate serializes access to it.

use super::types::Schedule;
use crate::domain::explorer::DecisionSource;
use crate::domain::sync::{JoinTracker, LockId, SynchronizationTracker, Transition};
use crate::domain::thread::{BlockReason, RunState, ThreadId, ThreadRegistry, ThreadStates};
use crate::error::{BlockedThread, InterleaveError, InterleaveResult};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::panic::Location;
use std::time::Duration;
use tracing::debug;

/// Model of one execution
///
/// `H` is the host thread handle, `D` the decision source consulted when
/// more than one thread could run.
pub struct SchedulerState<H, D>
where
    H: Eq + Hash + Clone + fmt::Debug,
    D: DecisionSource,
{
    registry: ThreadRegistry<H>,
    threads: ThreadStates,
    sync: SynchronizationTracker,
    joins: JoinTracker,

    /// Unpark permits not yet consumed by `park`
    permits: HashSet<ThreadId>,

    /// Threads with the interrupt flag set
    interrupted: HashSet<ThreadId>,

    /// Threads that already reached their exit
    terminated: HashSet<ThreadId>,

    /// Last source location each thread reported
    locations: HashMap<ThreadId, &'static Location<'static>>,

    root_exited: bool,
    decisions: usize,
    max_decisions: usize,
    source: D,
}

impl<H, D> SchedulerState<H, D>
where
    H: Eq + Hash + Clone + fmt::Debug,
    D: DecisionSource,
{
    /// Create the model of a fresh execution
    ///
    /// `max_decisions` bounds the number of explorer consultations.
    pub fn new(source: D, max_decisions: usize) -> Self {
        Self {
            registry: ThreadRegistry::new(),
            threads: ThreadStates::new(),
            sync: SynchronizationTracker::new(),
            joins: JoinTracker::new(),
            permits: HashSet::new(),
            interrupted: HashSet::new(),
            terminated: HashSet::new(),
            locations: HashMap::new(),
            root_exited: false,
            decisions: 0,
            max_decisions,
            source,
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Thread Lifecycle
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Register `host` as the root thread; it starts RUNNING
    pub fn begin(&mut self, host: H) -> ThreadId {
        let root = self.registry.create(host, None);
        self.threads.register(root.clone(), RunState::Running);
        debug!("🧵 {} registered as root", root);
        root
    }

    /// Register a child announced by `parent`
    ///
    /// The child starts RUNNABLE; it runs once the scheduler picks it.
    pub fn new_thread(&mut self, parent: &ThreadId) -> InterleaveResult<ThreadId> {
        self.validate(parent)?;
        let child = self.registry.allocate(Some(parent));
        self.threads.register(child.clone(), RunState::Runnable);
        debug!("🧵 {} spawned {}", parent, child);
        Ok(child)
    }

    /// Attach the host handle of a child that started executing
    pub fn bind(&mut self, host: H, thread: &ThreadId) -> InterleaveResult<()> {
        self.validate(thread)?;
        self.registry.bind(host, thread);
        Ok(())
    }

    /// Logical id of a host thread
    pub fn id_for(&self, host: &H) -> InterleaveResult<ThreadId> {
        self.registry.id_for(host)
    }

    /// `thread` finished: wake its joiners and forget it
    pub fn thread_terminated(&mut self, thread: &ThreadId) -> InterleaveResult<Schedule> {
        self.validate(thread)?;

        for joiner in self.joins.release(thread) {
            self.threads.unblock(&joiner);
        }
        self.threads.remove(thread);
        self.registry.forget(thread);
        self.locations.remove(thread);
        self.permits.remove(thread);
        self.interrupted.remove(thread);
        self.terminated.insert(thread.clone());
        if thread.is_root() {
            self.root_exited = true;
        }
        debug!("🏁 {} terminated", thread);

        self.pick(&format!("{} exit", thread))
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Scheduling
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Ordinary yield point at `location`
    pub fn yield_point(
        &mut self,
        thread: &ThreadId,
        location: &'static Location<'static>,
    ) -> InterleaveResult<Schedule> {
        self.validate(thread)?;
        self.locations.insert(thread.clone(), location);
        self.choose_next(thread)
    }

    /// Demote `thread` to RUNNABLE and compute who runs next
    pub fn choose_next(&mut self, thread: &ThreadId) -> InterleaveResult<Schedule> {
        self.validate(thread)?;
        if self.threads.is_running(thread) {
            self.threads.set_runnable(thread);
        }
        let label = self.label(thread);
        self.pick(&label)
    }

    fn pick(&mut self, label: &str) -> InterleaveResult<Schedule> {
        loop {
            let mut runnable = self.threads.runnable();
            let next = match runnable.len() {
                0 => return self.stalled(),
                1 => runnable.remove(0),
                _ => {
                    self.decisions += 1;
                    if self.decisions > self.max_decisions {
                        return Err(InterleaveError::DecisionLimitExceeded {
                            limit: self.max_decisions,
                        });
                    }
                    let chosen = self.source.decide(label, &runnable)?;
                    if !runnable.contains(&chosen) {
                        return Err(InterleaveError::UntrackedThread(chosen.to_string()));
                    }
                    debug!("🔀 {} -> {} of {:?}", label, chosen, runnable);
                    chosen
                }
            };

            self.threads.set_running(&next);
            let resumed = self.sync.thread_resumed(&next);
            if resumed.blocked.is_empty() {
                return Ok(Schedule::Resume(next));
            }

            // lost the race for its monitor, try someone else
            if let Some(lock) = self.sync.acquiring(&next) {
                self.threads.set_blocked(&next, BlockReason::Lock(lock));
            }
        }
    }

    fn stalled(&self) -> InterleaveResult<Schedule> {
        if self.threads.is_empty() {
            debug!("💤 execution quiescent");
            return Ok(Schedule::Quiescent);
        }

        let threads: Vec<BlockedThread> = self
            .threads
            .blocked()
            .into_iter()
            .map(|(thread, reason)| BlockedThread {
                location: self.locations.get(&thread).map(|l| l.to_string()),
                thread,
                reason,
            })
            .collect();

        if self.root_exited {
            Err(InterleaveError::DanglingThreads { threads })
        } else {
            Err(InterleaveError::Deadlock { blocked: threads })
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Monitors
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Acquire `lock`, blocking behind its holder if needed
    pub fn monitor_enter(&mut self, thread: &ThreadId, lock: LockId) -> InterleaveResult<Schedule> {
        self.validate(thread)?;
        let transition = self.sync.monitor_enter(thread, lock);
        if transition.blocked.is_empty() {
            return Ok(Schedule::Continue);
        }
        self.apply(transition, BlockReason::Lock(lock));
        let label = self.label(thread);
        self.pick(&label)
    }

    /// Release one level of `lock`; a release is always a scheduling point
    pub fn monitor_exit(&mut self, thread: &ThreadId, lock: LockId) -> InterleaveResult<Schedule> {
        self.validate(thread)?;
        let transition = self.sync.monitor_exit(thread, lock)?;
        self.apply(transition, BlockReason::Lock(lock));
        self.choose_next(thread)
    }

    /// Release `lock` and wait for a signal
    ///
    /// With a timeout the wait never blocks on the signal: the thread
    /// releases, yields and competes for the lock again.
    pub fn wait(
        &mut self,
        thread: &ThreadId,
        lock: LockId,
        timeout: Option<Duration>,
    ) -> InterleaveResult<Schedule> {
        self.validate(thread)?;
        let transition = self.sync.wait(thread, lock, timeout.is_some())?;
        self.apply(transition, BlockReason::Signal(lock));
        self.choose_next(thread)
    }

    /// Buffer one signal on `lock`
    pub fn notify(&mut self, thread: &ThreadId, lock: LockId) -> InterleaveResult<Schedule> {
        self.validate(thread)?;
        self.sync.notify(thread, lock)?;
        Ok(Schedule::Continue)
    }

    /// Buffer a signal for every waiter on `lock`
    pub fn notify_all(&mut self, thread: &ThreadId, lock: LockId) -> InterleaveResult<Schedule> {
        self.validate(thread)?;
        self.sync.notify_all(thread, lock)?;
        Ok(Schedule::Continue)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Park / Join / Interrupt
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Park `thread` unless a permit is available or it is interrupted
    pub fn park(&mut self, thread: &ThreadId) -> InterleaveResult<Schedule> {
        self.validate(thread)?;
        if self.permits.remove(thread) || self.interrupted.contains(thread) {
            return Ok(Schedule::Continue);
        }
        self.threads.set_blocked(thread, BlockReason::Park);
        let label = self.label(thread);
        self.pick(&label)
    }

    /// Make a parked `target` runnable, or leave it a permit
    ///
    /// Unparking a terminated thread is a no-op.
    pub fn unpark(&mut self, thread: &ThreadId, target: &ThreadId) -> InterleaveResult<Schedule> {
        self.validate(thread)?;
        if self.terminated.contains(target) {
            return Ok(Schedule::Continue);
        }
        self.validate(target)?;

        if self.threads.reason(target) == Some(&BlockReason::Park) {
            self.threads.unblock(target);
        } else {
            self.permits.insert(target.clone());
        }
        Ok(Schedule::Continue)
    }

    /// Wait for `joinee` to terminate
    ///
    /// Returns `Resume(joiner)` immediately if it already has. A timed join
    /// on a live thread behaves as if it timed out: it only yields.
    pub fn join(
        &mut self,
        joiner: &ThreadId,
        joinee: &ThreadId,
        timeout: Option<Duration>,
    ) -> InterleaveResult<Schedule> {
        self.validate(joiner)?;
        if self.terminated.contains(joinee) {
            return Ok(Schedule::Resume(joiner.clone()));
        }
        self.validate(joinee)?;

        if timeout.is_some() {
            return self.choose_next(joiner);
        }

        self.joins.add(joinee.clone(), joiner.clone());
        self.threads.set_blocked(joiner, BlockReason::Join(joinee.clone()));
        let label = self.label(joiner);
        self.pick(&label)
    }

    /// Set the interrupt flag of `target`
    ///
    /// A signal waiter moves to its monitor's lock queue; a parked thread
    /// becomes RUNNABLE right away.
    pub fn interrupt(&mut self, thread: &ThreadId, target: &ThreadId) -> InterleaveResult<Schedule> {
        self.validate(thread)?;
        if self.terminated.contains(target) {
            return Ok(Schedule::Continue);
        }
        self.validate(target)?;

        self.interrupted.insert(target.clone());
        let transition = self.sync.interrupt(target);
        for unblocked in &transition.unblocked {
            self.threads.unblock(unblocked);
        }
        if let Some(lock) = self.sync.acquiring(target) {
            if self.threads.state(target).is_some_and(RunState::is_blocked) {
                self.threads.set_blocked(target, BlockReason::Lock(lock));
            }
        }
        if self.threads.reason(target) == Some(&BlockReason::Park) {
            self.threads.unblock(target);
        }
        Ok(Schedule::Continue)
    }

    /// Read the interrupt flag of `thread`, clearing it if asked
    pub fn interrupted(&mut self, thread: &ThreadId, clear: bool) -> InterleaveResult<bool> {
        self.validate(thread)?;
        Ok(if clear {
            self.interrupted.remove(thread)
        } else {
            self.interrupted.contains(thread)
        })
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Queries
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Whether `thread` is the RUNNING thread
    pub fn is_running(&self, thread: &ThreadId) -> bool {
        self.threads.is_running(thread)
    }

    /// The RUNNING thread
    pub fn running(&self) -> Option<&ThreadId> {
        self.threads.running()
    }

    /// Number of RUNNING threads
    pub fn running_count(&self) -> usize {
        self.threads.running_count()
    }

    /// Run state of `thread`
    pub fn state(&self, thread: &ThreadId) -> Option<RunState> {
        self.threads.state(thread)
    }

    /// Whether every thread terminated
    pub fn is_quiescent(&self) -> bool {
        self.threads.is_empty()
    }

    /// Whether the root thread already exited
    pub fn root_exited(&self) -> bool {
        self.root_exited
    }

    /// Explorer consultations so far
    pub fn decisions(&self) -> usize {
        self.decisions
    }

    /// Monitor model, for inspection
    pub fn sync(&self) -> &SynchronizationTracker {
        &self.sync
    }

    /// The decision source
    pub fn source(&self) -> &D {
        &self.source
    }

    fn validate(&self, thread: &ThreadId) -> InterleaveResult<()> {
        if self.threads.contains(thread) {
            Ok(())
        } else {
            Err(InterleaveError::UntrackedThread(thread.to_string()))
        }
    }

    fn apply(&mut self, transition: Transition, reason: BlockReason) {
        for thread in &transition.blocked {
            self.threads.set_blocked(thread, reason.clone());
        }
        for thread in &transition.unblocked {
            self.threads.unblock(thread);
        }
    }

    fn label(&self, thread: &ThreadId) -> String {
        match self.locations.get(thread) {
            Some(location) => format!("{} @ {}", thread, location),
            None => format!("{} @ start", thread),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::explorer::{DepthFirstExplorer, Explorer};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Picks options by index from a script, recording every request
    #[derive(Default)]
    struct Script {
        choices: VecDeque<usize>,
        seen: Vec<(String, Vec<ThreadId>)>,
    }

    impl Script {
        fn new(choices: &[usize]) -> Self {
            Self {
                choices: choices.iter().copied().collect(),
                seen: Vec::new(),
            }
        }
    }

    impl DecisionSource for Script {
        fn decide(&mut self, label: &str, options: &[ThreadId]) -> InterleaveResult<ThreadId> {
            self.seen.push((label.to_string(), options.to_vec()));
            let index = self.choices.pop_front().unwrap_or(0);
            Ok(options[index].clone())
        }
    }

    const A: LockId = LockId::new(1);
    const B: LockId = LockId::new(2);

    fn setup(choices: &[usize]) -> (SchedulerState<u32, Script>, ThreadId, ThreadId) {
        let mut state = SchedulerState::new(Script::new(choices), 100);
        let root = state.begin(0);
        let child = state.new_thread(&root).unwrap();
        state.bind(1, &child).unwrap();
        (state, root, child)
    }

    #[test]
    fn test_single_runnable_needs_no_decision() {
        let (mut state, root, child) = setup(&[]);

        assert_eq!(state.thread_terminated(&root).unwrap(), Schedule::Resume(child.clone()));
        assert!(state.source().seen.is_empty());
        assert_eq!(state.thread_terminated(&child).unwrap(), Schedule::Quiescent);
        assert!(state.is_quiescent());
    }

    #[test]
    fn test_yield_consults_source_with_location_label() {
        let (mut state, root, child) = setup(&[1]);

        let schedule = state.yield_point(&root, Location::caller()).unwrap();
        assert_eq!(schedule, Schedule::Resume(child.clone()));
        assert_eq!(state.state(&root), Some(RunState::Runnable));
        assert_eq!(state.running_count(), 1);

        let (label, options) = &state.source().seen[0];
        assert!(label.starts_with("main @ "));
        assert_eq!(options, &vec![root, child]);
    }

    #[test]
    fn test_two_threads_give_exactly_two_paths() {
        let explorer = Arc::new(Mutex::new(DepthFirstExplorer::new()));
        let mut paths = Vec::new();

        while !explorer.lock().is_completely_tested() {
            let mut state = SchedulerState::new(explorer.clone(), 100);
            let root = state.begin(0);
            let child = state.new_thread(&root).unwrap();

            let first = state.yield_point(&root, Location::caller()).unwrap();
            let order = match first {
                Schedule::Resume(ref t) if *t == root => {
                    state.thread_terminated(&root).unwrap();
                    state.thread_terminated(&child).unwrap()
                }
                _ => {
                    state.thread_terminated(&child).unwrap();
                    state.thread_terminated(&root).unwrap()
                }
            };
            assert_eq!(order, Schedule::Quiescent);

            let mut explorer = explorer.lock();
            paths.push(explorer.trace().to_string());
            explorer.done().unwrap();
            assert!(paths.len() <= 2, "explored more than two paths");
        }

        assert_eq!(paths.len(), 2);
        assert_ne!(paths[0], paths[1]);
    }

    #[test]
    fn test_reentrant_release_unblocks_on_last_exit() {
        let (mut state, root, child) = setup(&[1, 1]);

        state.monitor_enter(&root, A).unwrap();
        assert_eq!(state.monitor_enter(&root, A).unwrap(), Schedule::Continue);

        // child runs and blocks on the held lock
        state.yield_point(&root, Location::caller()).unwrap();
        let schedule = state.monitor_enter(&child, A).unwrap();
        assert_eq!(schedule, Schedule::Resume(root.clone()));
        assert_eq!(state.state(&child), Some(RunState::Blocked));

        // first exit keeps the lock
        assert_eq!(state.monitor_exit(&root, A).unwrap(), Schedule::Resume(root.clone()));
        assert_eq!(state.state(&child), Some(RunState::Blocked));

        // second exit frees it and the child may take it
        let schedule = state.monitor_exit(&root, A).unwrap();
        assert_eq!(schedule, Schedule::Resume(child.clone()));
        assert_eq!(state.sync().owner(A), Some(&child));
    }

    #[test]
    fn test_lock_order_inversion_deadlocks() {
        let (mut state, root, child) = setup(&[1]);

        state.monitor_enter(&root, A).unwrap();
        state.yield_point(&root, Location::caller()).unwrap();
        state.monitor_enter(&child, B).unwrap();
        assert_eq!(state.monitor_enter(&child, A).unwrap(), Schedule::Resume(root.clone()));

        let err = state.monitor_enter(&root, B).unwrap_err();
        match err {
            InterleaveError::Deadlock { blocked } => {
                assert_eq!(blocked.len(), 2);
                assert_eq!(blocked[0].reason, Some(BlockReason::Lock(B)));
                assert_eq!(blocked[1].reason, Some(BlockReason::Lock(A)));
                assert!(blocked[0].location.is_some());
            }
            other => panic!("expected deadlock, got {other}"),
        }
    }

    #[test]
    fn test_join_terminated_thread_does_not_block() {
        let (mut state, root, child) = setup(&[1]);

        state.yield_point(&root, Location::caller()).unwrap();
        assert_eq!(state.thread_terminated(&child).unwrap(), Schedule::Resume(root.clone()));
        assert_eq!(state.join(&root, &child, None).unwrap(), Schedule::Resume(root.clone()));
    }

    #[test]
    fn test_join_blocks_until_termination() {
        let (mut state, root, child) = setup(&[]);

        assert_eq!(state.join(&root, &child, None).unwrap(), Schedule::Resume(child.clone()));
        assert_eq!(state.state(&root), Some(RunState::Blocked));

        assert_eq!(state.thread_terminated(&child).unwrap(), Schedule::Resume(root.clone()));
        assert_eq!(state.state(&root), Some(RunState::Running));
    }

    #[test]
    fn test_timed_join_only_yields() {
        let (mut state, root, child) = setup(&[0]);

        let schedule = state.join(&root, &child, Some(Duration::from_millis(5))).unwrap();
        assert_eq!(schedule, Schedule::Resume(root));
        assert_eq!(state.state(&child), Some(RunState::Runnable));
    }

    #[test]
    fn test_parked_threads_left_behind_are_dangling() {
        let (mut state, root, child) = setup(&[1]);

        state.yield_point(&root, Location::caller()).unwrap();
        assert_eq!(state.park(&child).unwrap(), Schedule::Resume(root.clone()));

        let err = state.thread_terminated(&root).unwrap_err();
        assert!(matches!(err, InterleaveError::DanglingThreads { ref threads } if threads.len() == 1));
        assert!(state.root_exited());
    }

    #[test]
    fn test_unpark_before_park_leaves_permit() {
        let (mut state, root, child) = setup(&[1]);

        state.unpark(&root, &child).unwrap();
        state.yield_point(&root, Location::caller()).unwrap();
        assert_eq!(state.park(&child).unwrap(), Schedule::Continue);
        assert_eq!(state.state(&child), Some(RunState::Running));
    }

    #[test]
    fn test_unpark_wakes_parked_thread() {
        let (mut state, root, child) = setup(&[1]);

        state.yield_point(&root, Location::caller()).unwrap();
        state.park(&child).unwrap();
        state.unpark(&root, &child).unwrap();
        assert_eq!(state.state(&child), Some(RunState::Runnable));
    }

    #[test]
    fn test_interrupt_parked_thread() {
        let (mut state, root, child) = setup(&[1]);

        state.yield_point(&root, Location::caller()).unwrap();
        state.park(&child).unwrap();
        state.interrupt(&root, &child).unwrap();
        assert_eq!(state.state(&child), Some(RunState::Runnable));

        // flag stays set, so the next park does not block
        state.thread_terminated(&root).unwrap();
        assert_eq!(state.park(&child).unwrap(), Schedule::Continue);
        assert!(state.interrupted(&child, true).unwrap());
        assert!(!state.interrupted(&child, false).unwrap());
    }

    #[test]
    fn test_interrupted_waiter_reacquires_lock() {
        let (mut state, root, child) = setup(&[1]);

        state.yield_point(&root, Location::caller()).unwrap();
        state.monitor_enter(&child, A).unwrap();
        assert_eq!(state.wait(&child, A, None).unwrap(), Schedule::Resume(root.clone()));

        state.monitor_enter(&root, A).unwrap();
        state.interrupt(&root, &child).unwrap();
        assert!(matches!(state.state(&child), Some(RunState::Blocked)));

        // release lets the child reacquire
        state.monitor_exit(&root, A).unwrap();
        assert_eq!(state.state(&child), Some(RunState::Runnable));
        state.thread_terminated(&root).unwrap();
        assert_eq!(state.sync().owner(A), Some(&child));
    }

    #[test]
    fn test_notify_wakes_waiter_after_release() {
        let (mut state, root, child) = setup(&[1, 1]);

        state.yield_point(&root, Location::caller()).unwrap();
        state.monitor_enter(&child, A).unwrap();
        state.wait(&child, A, None).unwrap();

        state.monitor_enter(&root, A).unwrap();
        state.notify(&root, A).unwrap();
        assert_eq!(state.state(&child), Some(RunState::Blocked));

        let schedule = state.monitor_exit(&root, A).unwrap();
        assert_eq!(schedule, Schedule::Resume(child.clone()));
        assert_eq!(state.sync().owner(A), Some(&child));
    }

    #[test]
    fn test_wait_without_lock_is_illegal() {
        let (mut state, root, _) = setup(&[]);
        let err = state.wait(&root, A, None).unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_untracked_thread_fails_fast() {
        let (mut state, root, _) = setup(&[]);
        let stranger = ThreadId::child(&root, 7);

        let err = state.yield_point(&stranger, Location::caller()).unwrap_err();
        assert!(matches!(err, InterleaveError::UntrackedThread(_)));
    }

    #[test]
    fn test_decision_limit() {
        let mut state = SchedulerState::<u32, _>::new(Script::new(&[]), 1);
        let root = state.begin(0);
        state.new_thread(&root).unwrap();

        state.yield_point(&root, Location::caller()).unwrap();
        let err = state.yield_point(&root, Location::caller()).unwrap_err();
        assert!(matches!(err, InterleaveError::DecisionLimitExceeded { limit: 1 }));
    }
}
