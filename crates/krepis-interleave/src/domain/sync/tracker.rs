//! # Synchronization Tracker
//!
//! Models ownership and reentrancy of monitors and the wait/notify queues on
//! them. Every operation turns an event plus the current monitor state into
//! a [`Transition`]: the threads that just became blocked and the threads
//! that may now proceed. The tracker never touches run states itself.
//!
//! # Release Algorithm
//!
//! ```text
//! monitor_exit(depth 2) ─> depth 1, nobody unblocked (reentrant exit)
//! monitor_exit(depth 1) ─> depth 0
//!     1. move one signal waiter per pending signal to the lock queue (FIFO)
//!     2. every lock waiter becomes runnable and retries on resume
//!     3. drop the record if nothing is queued
//! ```
//!
//! # Signal Ordering
//!
//! Pending signals are delivered to signal waiters in the order they started
//! waiting, and `notify_all` delivers to every waiter. This is a fixed
//! choice made by the model; the primitive being modeled promises no order
//! at all, so a program that depends on FIFO wakeups will pass here and may
//! still fail in production.

use super::monitor::{LockId, Monitor};
use crate::domain::thread::ThreadId;
use crate::error::{InterleaveError, InterleaveResult};
use std::collections::HashMap;

/// Status changes produced by one synchronization event
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Threads that must stop running
    pub blocked: Vec<ThreadId>,
    /// Threads that may be scheduled again
    pub unblocked: Vec<ThreadId>,
}

impl Transition {
    fn blocked(thread: ThreadId) -> Self {
        Self {
            blocked: vec![thread],
            unblocked: Vec::new(),
        }
    }

    fn unblocked(threads: Vec<ThreadId>) -> Self {
        Self {
            blocked: Vec::new(),
            unblocked: threads,
        }
    }

    /// Nothing changed
    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty() && self.unblocked.is_empty()
    }
}

/// Monitor state of one execution
#[derive(Debug, Default)]
pub struct SynchronizationTracker {
    monitors: HashMap<LockId, Monitor>,

    /// Threads queued to acquire or re-acquire a monitor
    acquiring: HashMap<ThreadId, LockId>,

    /// Threads waiting for a signal
    waiting: HashMap<ThreadId, LockId>,
}

impl SynchronizationTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to acquire `lock`
    ///
    /// Free locks are granted, held ones are re-entered by their owner.
    /// Otherwise the thread is queued and reported blocked; it retries via
    /// [`thread_resumed`](Self::thread_resumed) once scheduled again.
    pub fn monitor_enter(&mut self, thread: &ThreadId, lock: LockId) -> Transition {
        let monitor = self.monitors.entry(lock).or_default();
        match &monitor.owner {
            None => {
                monitor.owner = Some(thread.clone());
                monitor.depth = 1;
                Transition::default()
            }
            Some(owner) if owner == thread => {
                monitor.depth += 1;
                Transition::default()
            }
            Some(_) => {
                monitor.lock_waiters.push_back((thread.clone(), 1));
                self.acquiring.insert(thread.clone(), lock);
                Transition::blocked(thread.clone())
            }
        }
    }

    /// Release one level of `lock`
    pub fn monitor_exit(&mut self, thread: &ThreadId, lock: LockId) -> InterleaveResult<Transition> {
        let monitor = self.owned(thread, lock)?;
        monitor.depth -= 1;
        if monitor.depth > 0 {
            return Ok(Transition::default());
        }
        Ok(Transition::unblocked(self.release(lock)))
    }

    /// Release `lock` entirely and wait for a signal
    ///
    /// A timed wait is modeled as one that times out immediately: the thread
    /// goes straight to the lock queue instead of the signal queue and never
    /// blocks on the signal itself.
    pub fn wait(&mut self, thread: &ThreadId, lock: LockId, timed: bool) -> InterleaveResult<Transition> {
        let monitor = self.owned(thread, lock)?;
        let depth = monitor.depth;
        monitor.owner = None;
        monitor.depth = 0;

        let blocked = if timed {
            monitor.lock_waiters.push_back((thread.clone(), depth));
            self.acquiring.insert(thread.clone(), lock);
            Vec::new()
        } else {
            monitor.signal_waiters.push_back((thread.clone(), depth));
            self.waiting.insert(thread.clone(), lock);
            vec![thread.clone()]
        };

        let unblocked = self.release(lock);
        Ok(Transition { blocked, unblocked })
    }

    /// Buffer one signal, delivered when the owner releases
    pub fn notify(&mut self, thread: &ThreadId, lock: LockId) -> InterleaveResult<()> {
        let monitor = self.owned(thread, lock)?;
        monitor.pending_signals = (monitor.pending_signals + 1).min(monitor.signal_waiters.len());
        Ok(())
    }

    /// Buffer a signal for every current waiter
    pub fn notify_all(&mut self, thread: &ThreadId, lock: LockId) -> InterleaveResult<()> {
        let monitor = self.owned(thread, lock)?;
        monitor.pending_signals = monitor.signal_waiters.len();
        Ok(())
    }

    /// Interrupt a thread waiting for a signal
    ///
    /// The thread moves to the lock queue. It is unblocked right away only if
    /// the lock is free; otherwise it stays blocked until the holder releases.
    /// Threads not waiting for a signal are unaffected.
    pub fn interrupt(&mut self, thread: &ThreadId) -> Transition {
        let Some(lock) = self.waiting.remove(thread) else {
            return Transition::default();
        };
        let Some(monitor) = self.monitors.get_mut(&lock) else {
            return Transition::default();
        };
        let Some(depth) = monitor.take_signal_waiter(thread) else {
            return Transition::default();
        };

        monitor.lock_waiters.push_back((thread.clone(), depth));
        monitor.pending_signals = monitor.pending_signals.min(monitor.signal_waiters.len());
        self.acquiring.insert(thread.clone(), lock);

        if monitor.is_held() {
            Transition::default()
        } else {
            Transition::unblocked(vec![thread.clone()])
        }
    }

    /// Retry the acquisition of a thread that was just scheduled
    ///
    /// Grants the monitor at the thread's saved depth if it is free, or
    /// reports the thread blocked again behind the current holder. Threads
    /// with no pending acquisition get an empty transition.
    pub fn thread_resumed(&mut self, thread: &ThreadId) -> Transition {
        let Some(&lock) = self.acquiring.get(thread) else {
            return Transition::default();
        };
        let Some(monitor) = self.monitors.get_mut(&lock) else {
            self.acquiring.remove(thread);
            return Transition::default();
        };
        if monitor.is_held() {
            return Transition::blocked(thread.clone());
        }

        let depth = monitor.take_lock_waiter(thread).unwrap_or(1);
        monitor.owner = Some(thread.clone());
        monitor.depth = depth;
        self.acquiring.remove(thread);
        Transition::default()
    }

    /// Lock the thread is queued to acquire, if any
    pub fn acquiring(&self, thread: &ThreadId) -> Option<LockId> {
        self.acquiring.get(thread).copied()
    }

    /// Lock the thread waits to be signalled on, if any
    pub fn waiting_on(&self, thread: &ThreadId) -> Option<LockId> {
        self.waiting.get(thread).copied()
    }

    /// Current holder of `lock`
    pub fn owner(&self, lock: LockId) -> Option<&ThreadId> {
        self.monitors.get(&lock).and_then(|m| m.owner.as_ref())
    }

    /// Reentrancy depth of `lock` (0 when free)
    pub fn depth(&self, lock: LockId) -> usize {
        self.monitors.get(&lock).map_or(0, |m| m.depth)
    }

    /// Undelivered signals on `lock`
    pub fn pending_signals(&self, lock: LockId) -> usize {
        self.monitors.get(&lock).map_or(0, |m| m.pending_signals)
    }

    /// Whether a record exists for `lock`
    pub fn is_tracked(&self, lock: LockId) -> bool {
        self.monitors.contains_key(&lock)
    }

    /// Number of live monitor records
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    /// Whether no monitor is live
    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    fn owned(&mut self, thread: &ThreadId, lock: LockId) -> InterleaveResult<&mut Monitor> {
        match self.monitors.get_mut(&lock) {
            Some(monitor) if monitor.is_owned_by(thread) => Ok(monitor),
            _ => Err(InterleaveError::IllegalMonitorState {
                thread: thread.clone(),
                lock,
            }),
        }
    }

    fn release(&mut self, lock: LockId) -> Vec<ThreadId> {
        let Some(monitor) = self.monitors.get_mut(&lock) else {
            return Vec::new();
        };
        monitor.owner = None;
        monitor.depth = 0;

        while monitor.pending_signals > 0 {
            monitor.pending_signals -= 1;
            if let Some((thread, depth)) = monitor.signal_waiters.pop_front() {
                self.waiting.remove(&thread);
                self.acquiring.insert(thread.clone(), lock);
                monitor.lock_waiters.push_back((thread, depth));
            }
        }

        let unblocked = monitor.lock_waiters.iter().map(|(t, _)| t.clone()).collect();
        if monitor.is_idle() {
            self.monitors.remove(&lock);
        }
        unblocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const L: LockId = LockId::new(1);

    fn threads() -> (ThreadId, ThreadId, ThreadId) {
        let root = ThreadId::root();
        let a = ThreadId::child(&root, 0);
        let b = ThreadId::child(&root, 1);
        (root, a, b)
    }

    #[test]
    fn test_reentrant_acquire_and_release() {
        let (root, a, _) = threads();
        let mut sync = SynchronizationTracker::new();

        assert!(sync.monitor_enter(&root, L).is_empty());
        assert!(sync.monitor_enter(&root, L).is_empty());
        assert_eq!(sync.depth(L), 2);

        let t = sync.monitor_enter(&a, L);
        assert_eq!(t.blocked, vec![a.clone()]);

        let t = sync.monitor_exit(&root, L).unwrap();
        assert!(t.unblocked.is_empty());
        assert_eq!(sync.owner(L), Some(&root));

        let t = sync.monitor_exit(&root, L).unwrap();
        assert_eq!(t.unblocked, vec![a.clone()]);
        assert_eq!(sync.owner(L), None);

        assert!(sync.thread_resumed(&a).is_empty());
        assert_eq!(sync.owner(L), Some(&a));
        sync.monitor_exit(&a, L).unwrap();
        assert!(!sync.is_tracked(L));
    }

    #[test]
    fn test_exit_without_ownership_is_illegal() {
        let (root, a, _) = threads();
        let mut sync = SynchronizationTracker::new();
        sync.monitor_enter(&root, L);

        let err = sync.monitor_exit(&a, L).unwrap_err();
        assert!(matches!(err, InterleaveError::IllegalMonitorState { .. }));
        assert!(sync.wait(&a, L, false).is_err());
        assert!(sync.notify(&a, L).is_err());
        assert!(sync.notify_all(&a, LockId::new(9)).is_err());
    }

    #[test]
    fn test_signal_delivered_on_release() {
        let (root, a, _) = threads();
        let mut sync = SynchronizationTracker::new();

        sync.monitor_enter(&a, L);
        sync.monitor_enter(&a, L);
        let t = sync.wait(&a, L, false).unwrap();
        assert_eq!(t.blocked, vec![a.clone()]);
        assert_eq!(sync.waiting_on(&a), Some(L));

        sync.monitor_enter(&root, L);
        sync.notify(&root, L).unwrap();
        assert_eq!(sync.pending_signals(L), 1);
        assert_eq!(sync.waiting_on(&a), Some(L));

        let t = sync.monitor_exit(&root, L).unwrap();
        assert_eq!(t.unblocked, vec![a.clone()]);
        assert_eq!(sync.waiting_on(&a), None);
        assert_eq!(sync.acquiring(&a), Some(L));

        sync.thread_resumed(&a);
        assert_eq!(sync.depth(L), 2);
    }

    #[test]
    fn test_notify_without_waiters_is_lost() {
        let (root, a, _) = threads();
        let mut sync = SynchronizationTracker::new();

        sync.monitor_enter(&root, L);
        sync.notify(&root, L).unwrap();
        assert_eq!(sync.pending_signals(L), 0);
        sync.monitor_exit(&root, L).unwrap();

        sync.monitor_enter(&a, L);
        let t = sync.wait(&a, L, false).unwrap();
        assert_eq!(t.blocked, vec![a]);
        assert!(t.unblocked.is_empty());
    }

    #[test]
    fn test_notify_all_wakes_every_waiter_in_order() {
        let (root, a, b) = threads();
        let mut sync = SynchronizationTracker::new();

        sync.monitor_enter(&a, L);
        sync.wait(&a, L, false).unwrap();
        sync.monitor_enter(&b, L);
        sync.wait(&b, L, false).unwrap();

        sync.monitor_enter(&root, L);
        sync.notify_all(&root, L).unwrap();
        let t = sync.monitor_exit(&root, L).unwrap();
        assert_eq!(t.unblocked, vec![a.clone(), b.clone()]);

        // a wins, b re-blocks behind it
        assert!(sync.thread_resumed(&a).is_empty());
        assert_eq!(sync.thread_resumed(&b).blocked, vec![b.clone()]);
    }

    #[test]
    fn test_interrupt_moves_waiter_to_lock_queue() {
        let (root, a, _) = threads();
        let mut sync = SynchronizationTracker::new();

        sync.monitor_enter(&a, L);
        sync.wait(&a, L, false).unwrap();

        // lock held: still blocked until release
        sync.monitor_enter(&root, L);
        assert!(sync.interrupt(&a).is_empty());
        assert_eq!(sync.acquiring(&a), Some(L));
        let t = sync.monitor_exit(&root, L).unwrap();
        assert_eq!(t.unblocked, vec![a.clone()]);

        assert!(sync.interrupt(&root).is_empty());
    }

    #[test]
    fn test_interrupt_with_free_lock_unblocks() {
        let (_, a, _) = threads();
        let mut sync = SynchronizationTracker::new();

        sync.monitor_enter(&a, L);
        sync.wait(&a, L, false).unwrap();
        assert_eq!(sync.interrupt(&a).unblocked, vec![a.clone()]);
        sync.thread_resumed(&a);
        assert_eq!(sync.owner(L), Some(&a));
    }

    #[test]
    fn test_timed_wait_does_not_block() {
        let (_, a, _) = threads();
        let mut sync = SynchronizationTracker::new();

        sync.monitor_enter(&a, L);
        let t = sync.wait(&a, L, true).unwrap();
        assert!(t.blocked.is_empty());
        assert_eq!(sync.owner(L), None);
        assert_eq!(sync.acquiring(&a), Some(L));

        sync.thread_resumed(&a);
        assert_eq!(sync.owner(L), Some(&a));
    }
}
