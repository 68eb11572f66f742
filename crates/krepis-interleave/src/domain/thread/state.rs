//! Per-execution thread run states
//!
//! # State Transitions
//!
//! ```text
//!             choose_next / yield
//!   RUNNING ─────────────────────> RUNNABLE
//!      │  ↑                           │
//!      │  └───────── scheduled ───────┘
//!      │                              ↑
//!      └──> BLOCKED ── unblocked ─────┘
//!        (lock, signal, park, join)
//! ```
//!
//! At most one thread is RUNNING at any time. Entries are removed entirely
//! when a thread terminates. Only `SchedulerState` drives transitions.

use super::id::ThreadId;
use crate::domain::sync::LockId;
use std::collections::BTreeMap;
use std::fmt;

/// Scheduling state of a registered thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Executing test code; unique across the execution
    Running,
    /// Waiting for a lock, signal, unpark or another thread's exit
    Blocked,
    /// Eligible to be chosen next
    Runnable,
}

impl RunState {
    /// Check if the thread currently executes test code
    #[inline(always)]
    pub const fn is_running(self) -> bool {
        matches!(self, RunState::Running)
    }

    /// Check if the thread waits on something
    #[inline(always)]
    pub const fn is_blocked(self) -> bool {
        matches!(self, RunState::Blocked)
    }

    /// Check if the thread may be scheduled
    #[inline(always)]
    pub const fn is_runnable(self) -> bool {
        matches!(self, RunState::Runnable)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Running => write!(f, "RUNNING"),
            RunState::Blocked => write!(f, "BLOCKED"),
            RunState::Runnable => write!(f, "RUNNABLE"),
        }
    }
}

/// What a BLOCKED thread is waiting for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockReason {
    /// Acquiring (or re-acquiring) a monitor held by another thread
    Lock(LockId),
    /// Waiting for a signal on a monitor
    Signal(LockId),
    /// Parked until unparked or interrupted
    Park,
    /// Joining another thread
    Join(ThreadId),
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::Lock(lock) => write!(f, "{}", lock),
            BlockReason::Signal(lock) => write!(f, "signal of {}", lock),
            BlockReason::Park => write!(f, "park"),
            BlockReason::Join(thread) => write!(f, "join of {}", thread),
        }
    }
}

#[derive(Debug, Clone)]
struct ThreadEntry {
    state: RunState,
    reason: Option<BlockReason>,
}

/// Run states of every live thread in one execution
///
/// Backed by a `BTreeMap` so that runnable sets come out in lineage order,
/// which keeps the options offered to the explorer identical across runs.
#[derive(Debug, Default)]
pub struct ThreadStates {
    entries: BTreeMap<ThreadId, ThreadEntry>,
}

impl ThreadStates {
    /// Create an empty state table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new thread in the given state
    pub fn register(&mut self, thread: ThreadId, state: RunState) {
        debug_assert!(
            !state.is_running() || !self.has_running(),
            "registering a second RUNNING thread"
        );
        self.entries.insert(thread, ThreadEntry { state, reason: None });
    }

    /// Current state of a thread, `None` if unknown or terminated
    pub fn state(&self, thread: &ThreadId) -> Option<RunState> {
        self.entries.get(thread).map(|entry| entry.state)
    }

    /// Whether the thread is registered
    pub fn contains(&self, thread: &ThreadId) -> bool {
        self.entries.contains_key(thread)
    }

    /// Whether the thread is the RUNNING one
    pub fn is_running(&self, thread: &ThreadId) -> bool {
        self.state(thread).is_some_and(RunState::is_running)
    }

    /// Make `thread` the RUNNING thread
    ///
    /// Returns `false` if the thread is unknown.
    pub fn set_running(&mut self, thread: &ThreadId) -> bool {
        debug_assert!(
            self.running().map_or(true, |current| current == thread),
            "a second thread would become RUNNING"
        );
        self.update(thread, RunState::Running, None)
    }

    /// Demote a thread to RUNNABLE
    pub fn set_runnable(&mut self, thread: &ThreadId) -> bool {
        self.update(thread, RunState::Runnable, None)
    }

    /// Block a thread, remembering why
    pub fn set_blocked(&mut self, thread: &ThreadId, reason: BlockReason) -> bool {
        self.update(thread, RunState::Blocked, Some(reason))
    }

    /// BLOCKED -> RUNNABLE; other states are left alone
    ///
    /// Returns `true` if the thread changed state.
    pub fn unblock(&mut self, thread: &ThreadId) -> bool {
        match self.entries.get_mut(thread) {
            Some(entry) if entry.state.is_blocked() => {
                entry.state = RunState::Runnable;
                entry.reason = None;
                true
            }
            _ => false,
        }
    }

    /// Forget a terminated thread
    pub fn remove(&mut self, thread: &ThreadId) -> Option<RunState> {
        self.entries.remove(thread).map(|entry| entry.state)
    }

    /// The RUNNING thread, if any
    pub fn running(&self) -> Option<&ThreadId> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.state.is_running())
            .map(|(thread, _)| thread)
    }

    /// Is there a RUNNING thread
    pub fn has_running(&self) -> bool {
        self.running().is_some()
    }

    /// Number of RUNNING threads (0 or 1 while the invariant holds)
    pub fn running_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.state.is_running()).count()
    }

    /// RUNNABLE threads in lineage order
    pub fn runnable(&self) -> Vec<ThreadId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.state.is_runnable())
            .map(|(thread, _)| thread.clone())
            .collect()
    }

    /// BLOCKED threads with their reasons, in lineage order
    pub fn blocked(&self) -> Vec<(ThreadId, Option<BlockReason>)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.state.is_blocked())
            .map(|(thread, entry)| (thread.clone(), entry.reason.clone()))
            .collect()
    }

    /// Why a thread is blocked
    pub fn reason(&self, thread: &ThreadId) -> Option<&BlockReason> {
        self.entries.get(thread).and_then(|entry| entry.reason.as_ref())
    }

    /// Nothing runs, nothing can run, yet threads remain
    pub fn is_deadlocked(&self) -> bool {
        !self.entries.is_empty()
            && self
                .entries
                .values()
                .all(|entry| entry.state.is_blocked())
    }

    /// Number of live threads
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether every thread has terminated
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn update(&mut self, thread: &ThreadId, state: RunState, reason: Option<BlockReason>) -> bool {
        match self.entries.get_mut(thread) {
            Some(entry) => {
                entry.state = state;
                entry.reason = reason;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threads() -> (ThreadId, ThreadId, ThreadId) {
        let root = ThreadId::root();
        let a = ThreadId::child(&root, 0);
        let b = ThreadId::child(&root, 1);
        (root, a, b)
    }

    #[test]
    fn test_runnable_set_is_ordered() {
        let (root, a, b) = threads();
        let mut states = ThreadStates::new();
        states.register(b.clone(), RunState::Runnable);
        states.register(root.clone(), RunState::Running);
        states.register(a.clone(), RunState::Runnable);

        assert_eq!(states.runnable(), vec![a, b]);
        assert_eq!(states.running(), Some(&root));
        assert_eq!(states.running_count(), 1);
    }

    #[test]
    fn test_unblock_only_touches_blocked() {
        let (root, a, _) = threads();
        let mut states = ThreadStates::new();
        states.register(root.clone(), RunState::Running);
        states.register(a.clone(), RunState::Runnable);

        assert!(!states.unblock(&root));
        assert!(!states.unblock(&a));

        states.set_blocked(&a, BlockReason::Park);
        assert_eq!(states.reason(&a), Some(&BlockReason::Park));
        assert!(states.unblock(&a));
        assert_eq!(states.state(&a), Some(RunState::Runnable));
        assert_eq!(states.reason(&a), None);
    }

    #[test]
    fn test_deadlock_detection() {
        let (root, a, _) = threads();
        let mut states = ThreadStates::new();
        assert!(!states.is_deadlocked());

        states.register(root.clone(), RunState::Running);
        states.register(a.clone(), RunState::Blocked);
        assert!(!states.is_deadlocked());

        states.set_blocked(&root, BlockReason::Join(a.clone()));
        assert!(states.is_deadlocked());
        assert_eq!(states.blocked().len(), 2);
    }

    #[test]
    fn test_remove_forgets_thread() {
        let (root, _, _) = threads();
        let mut states = ThreadStates::new();
        states.register(root.clone(), RunState::Running);

        assert_eq!(states.remove(&root), Some(RunState::Running));
        assert!(states.is_empty());
        assert!(!states.set_running(&root));
    }
}
