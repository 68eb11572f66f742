//! Monitor records
//!
//! A monitor is a mutual-exclusion region plus the signal-wait queue layered
//! on it. Records are created lazily on the first acquisition attempt and
//! dropped by the tracker once they are idle again.

use crate::domain::thread::ThreadId;
use std::collections::VecDeque;
use std::fmt;

/// Identity of a lock object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockId(pub u64);

impl LockId {
    /// Wrap a raw lock number
    #[inline(always)]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw lock number
    #[inline(always)]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lock#{}", self.0)
    }
}

/// State of one monitor
///
/// Invariant: `depth > 0` iff `owner` is set, and a thread appears in at most
/// one of `owner`, `lock_waiters`, `signal_waiters`.
#[derive(Debug, Default, Clone)]
pub struct Monitor {
    /// Current holder
    pub owner: Option<ThreadId>,

    /// Reentrancy depth of the holder
    pub depth: usize,

    /// Threads waiting to (re)acquire, with the depth they resume at
    pub lock_waiters: VecDeque<(ThreadId, usize)>,

    /// Threads waiting for a signal, with their depth at the time they waited
    pub signal_waiters: VecDeque<(ThreadId, usize)>,

    /// Signals issued but not yet delivered (delivered on release)
    pub pending_signals: usize,
}

impl Monitor {
    /// Is the lock held by anyone
    #[inline]
    pub fn is_held(&self) -> bool {
        self.owner.is_some()
    }

    /// Is `thread` the holder
    #[inline]
    pub fn is_owned_by(&self, thread: &ThreadId) -> bool {
        self.owner.as_ref() == Some(thread)
    }

    /// Free, with nobody queued and nothing buffered
    pub fn is_idle(&self) -> bool {
        self.owner.is_none()
            && self.lock_waiters.is_empty()
            && self.signal_waiters.is_empty()
            && self.pending_signals == 0
    }

    /// Remove `thread` from the lock queue, returning its saved depth
    pub(crate) fn take_lock_waiter(&mut self, thread: &ThreadId) -> Option<usize> {
        let index = self.lock_waiters.iter().position(|(t, _)| t == thread)?;
        self.lock_waiters.remove(index).map(|(_, depth)| depth)
    }

    /// Remove `thread` from the signal queue, returning its saved depth
    pub(crate) fn take_signal_waiter(&mut self, thread: &ThreadId) -> Option<usize> {
        let index = self.signal_waiters.iter().position(|(t, _)| t == thread)?;
        self.signal_waiters.remove(index).map(|(_, depth)| depth)
    }
}
