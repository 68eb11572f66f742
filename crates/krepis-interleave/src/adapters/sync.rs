//! Model-checked mutex with monitor wait/notify
//!
//! [`Mutex`] is a monitor: `lock` is a scheduling point followed by
//! `monitor_enter`, dropping the guard is `monitor_exit` (also a scheduling
//! point), and the guard exposes the monitor's wait/notify operations.
//!
//! The data itself sits in a `parking_lot::Mutex` that is only ever taken by
//! the logical owner, so it never contends.

use crate::domain::sync::LockId;
use crate::error::InterleaveError;
use crate::infrastructure::context::{self, bail};
use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

static NEXT_LOCK: AtomicU64 = AtomicU64::new(0);

/// Mutual exclusion whose acquisition order is chosen by the explorer
pub struct Mutex<T: ?Sized> {
    id: LockId,
    data: parking_lot::Mutex<T>,
}

impl<T> Mutex<T> {
    /// Wrap `value`; usable inside or outside a model run
    pub fn new(value: T) -> Self {
        Self {
            id: LockId::new(NEXT_LOCK.fetch_add(1, Ordering::Relaxed)),
            data: parking_lot::Mutex::new(value),
        }
    }

    /// Consume the mutex, returning the data
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> Mutex<T> {
    /// Monitor id of this mutex
    pub fn id(&self) -> LockId {
        self.id
    }

    /// Acquire the mutex, blocking in the model until it is granted
    ///
    /// # Panics
    ///
    /// Panics outside of a model run.
    ///
    /// Like `std::sync::Mutex`, this mutex is not reentrant: locking it
    /// while the calling thread already holds it fails the execution with
    /// `TestPanicked`. The monitor model underneath counts nested entries;
    /// code that needs them reports `monitor_enter`/`monitor_exit` through
    /// the event sink directly.
    #[track_caller]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        let location = Location::caller();
        let cx = context::expect_current();
        let sink = cx.sink();
        sink.yield_point(location).unwrap_or_else(|err| bail(err));
        sink.monitor_enter(self.id).unwrap_or_else(|err| bail(err));

        match self.data.try_lock() {
            Some(data) => MutexGuard {
                lock: self,
                data: ManuallyDrop::new(data),
            },
            None => {
                let err = InterleaveError::TestPanicked {
                    thread: sink.current().map(|t| t.to_string()).unwrap_or_default(),
                    message: format!("{} locked twice by the same thread at {}", self.id, location),
                };
                sink.abort(err.clone());
                bail(err)
            }
        }
    }

    /// Mutable access without locking
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Held mutex; releases on drop
pub struct MutexGuard<'a, T: ?Sized> {
    lock: &'a Mutex<T>,
    data: ManuallyDrop<parking_lot::MutexGuard<'a, T>>,
}

impl<'a, T: ?Sized> MutexGuard<'a, T> {
    /// Release the mutex, wait for a notification, then re-acquire it
    ///
    /// Returns `true` when the wait ended because the thread was
    /// interrupted; the interrupt flag is cleared in that case. A thread
    /// whose flag is already set returns `true` at once, still holding the
    /// mutex.
    pub fn wait(&mut self) -> bool {
        self.wait_inner(None)
    }

    /// Like [`wait`](Self::wait), but the model treats the wait as timed out
    /// at once: the mutex is released, other threads may run, and the
    /// caller competes for the mutex again without waiting for a signal
    ///
    /// The result reports an interrupt the same way as `wait`.
    pub fn wait_timeout(&mut self, timeout: Duration) -> bool {
        self.wait_inner(Some(timeout))
    }

    /// Wake one waiter once this guard releases
    pub fn notify_one(&self) {
        let cx = context::expect_current();
        cx.sink().signal_one(self.lock.id).unwrap_or_else(|err| bail(err));
    }

    /// Wake every waiter once this guard releases
    pub fn notify_all(&self) {
        let cx = context::expect_current();
        cx.sink().signal_all(self.lock.id).unwrap_or_else(|err| bail(err));
    }

    fn wait_inner(&mut self, timeout: Option<Duration>) -> bool {
        let cx = context::expect_current();
        let sink = cx.sink();
        if sink.interrupted(true).unwrap_or_else(|err| bail(err)) {
            return true;
        }

        let id = self.lock.id;
        let outcome = parking_lot::MutexGuard::unlocked(&mut *self.data, || sink.wait(id, timeout));
        outcome.unwrap_or_else(|err| bail(err));
        sink.interrupted(true).unwrap_or_else(|err| bail(err))
    }
}

impl<T: ?Sized> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T: ?Sized> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

impl<T: ?Sized> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        // SAFETY: `data` is dropped exactly once, here, and never used again.
        // The real lock must be free before the release is reported, since
        // the next owner may run as soon as `monitor_exit` schedules it.
        unsafe { ManuallyDrop::drop(&mut self.data) };

        // A panicking thread keeps running until the harness records the
        // panic; reporting the release here would schedule other threads.
        if std::thread::panicking() {
            return;
        }
        if let Some(cx) = context::current() {
            if let Err(err) = cx.sink().monitor_exit(self.lock.id) {
                bail(err);
            }
        }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for MutexGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
