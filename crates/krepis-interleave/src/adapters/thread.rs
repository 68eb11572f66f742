//! Model-checked threads
//!
//! Drop-in counterparts of `std::thread` items that report to the current
//! execution. `spawn` and `yield_now` are scheduling points labelled with
//! the caller's source location.
//!
//! Every function panics when called outside [`Harness::check`](crate::Harness::check).

use crate::domain::thread::ThreadId;
use crate::error::InterleaveError;
use crate::infrastructure::context::{self, bail, is_abort, panic_message};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::Arc;
use std::thread as host;
use std::time::Duration;
use tracing::debug;

/// Handle to a logical thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    id: ThreadId,
}

impl Thread {
    /// Structural id of the thread
    pub fn id(&self) -> &ThreadId {
        &self.id
    }

    /// Display name of the thread
    pub fn name(&self) -> &str {
        self.id.name()
    }

    /// Release the thread from `park`, or let its next `park` return at once
    pub fn unpark(&self) {
        let cx = context::expect_current();
        cx.sink().unpark(&self.id).unwrap_or_else(|err| bail(err));
    }

    /// Set the thread's interrupt flag
    ///
    /// A thread waiting on a [`Condvar`](super::sync::MutexGuard::wait)-style
    /// wait competes for its lock again; a parked thread wakes up.
    pub fn interrupt(&self) {
        let cx = context::expect_current();
        cx.sink().interrupt(&self.id).unwrap_or_else(|err| bail(err));
    }
}

/// Owned permission to join a spawned thread
#[derive(Debug)]
pub struct JoinHandle<T> {
    thread: Thread,
    result: Arc<Mutex<Option<T>>>,
}

impl<T> JoinHandle<T> {
    /// The spawned thread
    pub fn thread(&self) -> &Thread {
        &self.thread
    }

    /// Wait for the thread to finish and take its result
    ///
    /// A panicking thread fails the whole execution, so a join that returns
    /// always carries the closure's value.
    pub fn join(self) -> host::Result<T> {
        let cx = context::expect_current();
        cx.sink().join(&self.thread.id, None).unwrap_or_else(|err| bail(err));
        self.take()
    }

    /// Join with a timeout
    ///
    /// The model never waits for the timeout: if the thread has not finished
    /// at this point of the interleaving, the join yields once and returns
    /// `None`.
    pub fn join_timeout(&self, timeout: Duration) -> Option<T> {
        let cx = context::expect_current();
        cx.sink()
            .join(&self.thread.id, Some(timeout))
            .unwrap_or_else(|err| bail(err));
        self.result.lock().take()
    }

    /// Whether the thread has produced its result
    pub fn is_finished(&self) -> bool {
        self.result.lock().is_some()
    }

    fn take(&self) -> host::Result<T> {
        match self.result.lock().take() {
            Some(value) => Ok(value),
            None => Err(Box::new(format!("{} produced no result", self.thread.id))),
        }
    }
}

/// Spawn a logical thread running `f`
///
/// # Panics
///
/// Panics outside of a model run, or if the host thread cannot be created.
#[track_caller]
pub fn spawn<F, T>(f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let location = Location::caller();
    let cx = context::expect_current();
    let id = cx.sink().thread_start().unwrap_or_else(|err| bail(err));

    let result = Arc::new(Mutex::new(None));
    let slot = result.clone();
    let child_cx = cx.clone();
    let child = id.clone();

    let host = host::Builder::new()
        .name(id.to_string())
        .spawn(move || {
            let _entered = context::enter(child_cx.clone());
            let sink = child_cx.sink();
            if sink.thread_started(&child).is_err() {
                return;
            }

            match panic::catch_unwind(AssertUnwindSafe(f)) {
                Ok(value) => {
                    *slot.lock() = Some(value);
                    // Err only when another thread already failed the run
                    let _ = sink.thread_exit();
                }
                Err(payload) if is_abort(payload.as_ref()) => {
                    debug!("🛑 {} unwound after abort", child);
                }
                Err(payload) => sink.abort(InterleaveError::TestPanicked {
                    thread: child.to_string(),
                    message: panic_message(payload.as_ref()),
                }),
            }
        });

    match host {
        Ok(host) => cx.adopt(host),
        Err(err) => panic!("failed to spawn host thread for {}: {}", id, err),
    }

    cx.sink().yield_point(location).unwrap_or_else(|err| bail(err));
    JoinHandle {
        thread: Thread { id },
        result,
    }
}

/// Handle to the calling logical thread
pub fn current() -> Thread {
    let cx = context::expect_current();
    let id = cx.sink().current().unwrap_or_else(|err| bail(err));
    Thread { id }
}

/// Let the scheduler run another thread here
#[track_caller]
pub fn yield_now() {
    let location = Location::caller();
    let cx = context::expect_current();
    cx.sink().yield_point(location).unwrap_or_else(|err| bail(err));
}

/// Block until unparked, unless a permit is pending or the thread is
/// interrupted
pub fn park() {
    let cx = context::expect_current();
    cx.sink().park().unwrap_or_else(|err| bail(err));
}

/// Read and clear the calling thread's interrupt flag
pub fn interrupted() -> bool {
    let cx = context::expect_current();
    cx.sink().interrupted(true).unwrap_or_else(|err| bail(err))
}

/// Read the calling thread's interrupt flag without clearing it
pub fn is_interrupted() -> bool {
    let cx = context::expect_current();
    cx.sink().interrupted(false).unwrap_or_else(|err| bail(err))
}
