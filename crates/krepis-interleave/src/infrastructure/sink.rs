//! Concurrency event feed
//!
//! Whatever intercepts the concurrency primitives of a test (the cooperative
//! wrappers in [`adapters`](crate::adapters), or any other producer) reports
//! to a [`ConcurrencyEventSink`]. Every call blocks the calling host thread
//! until the scheduler lets it proceed.
//!
//! Calls are made from the acting host thread; the sink identifies the
//! logical thread from it. An `Err` means the execution failed (on this
//! thread or another one) and the caller must unwind without reporting
//! further events.

use crate::domain::sync::LockId;
use crate::domain::thread::ThreadId;
use crate::error::{InterleaveError, InterleaveResult};
use std::panic::Location;
use std::time::Duration;

/// Receiver of the events of one execution
pub trait ConcurrencyEventSink: Send + Sync {
    /// The calling thread is about to spawn a child; returns its id
    ///
    /// Does not block. The parent should report a yield point once the
    /// child's host thread exists.
    fn thread_start(&self) -> InterleaveResult<ThreadId>;

    /// First event of a spawned host thread; blocks until it is scheduled
    fn thread_started(&self, thread: &ThreadId) -> InterleaveResult<()>;

    /// Last event of a spawned thread; never blocks
    fn thread_exit(&self) -> InterleaveResult<()>;

    /// Acquire a monitor
    fn monitor_enter(&self, lock: LockId) -> InterleaveResult<()>;

    /// Release one level of a monitor
    fn monitor_exit(&self, lock: LockId) -> InterleaveResult<()>;

    /// Release a held monitor, wait for a signal, then re-acquire it
    fn wait(&self, lock: LockId, timeout: Option<Duration>) -> InterleaveResult<()>;

    /// Signal one waiter of a held monitor
    fn signal_one(&self, lock: LockId) -> InterleaveResult<()>;

    /// Signal every waiter of a held monitor
    fn signal_all(&self, lock: LockId) -> InterleaveResult<()>;

    /// Park the calling thread
    fn park(&self) -> InterleaveResult<()>;

    /// Unpark `thread`
    fn unpark(&self, thread: &ThreadId) -> InterleaveResult<()>;

    /// Wait for `thread` to terminate
    fn join(&self, thread: &ThreadId, timeout: Option<Duration>) -> InterleaveResult<()>;

    /// Interrupt `thread`
    fn interrupt(&self, thread: &ThreadId) -> InterleaveResult<()>;

    /// Read (and optionally clear) the calling thread's interrupt flag
    fn interrupted(&self, clear: bool) -> InterleaveResult<bool>;

    /// Ordinary scheduling point at `location`
    fn yield_point(&self, location: &'static Location<'static>) -> InterleaveResult<()>;

    /// Logical id of the calling thread
    fn current(&self) -> InterleaveResult<ThreadId>;

    /// Fail the execution; every blocked thread is woken with `Aborted`
    fn abort(&self, error: InterleaveError);
}
