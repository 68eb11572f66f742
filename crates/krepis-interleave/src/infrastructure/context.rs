//! Per-thread execution context
//!
//! The event sink of the running execution is reached through a
//! thread-local slot instead of a process-wide listener. The harness enters
//! a context on the root thread, and every spawned host thread enters a clone
//! of its parent's context before running test code. Concurrent harness runs
//! on different test threads therefore never see each other's sink.

use crate::error::InterleaveError;
use crate::infrastructure::sink::ConcurrencyEventSink;
use parking_lot::Mutex;
use std::any::Any;
use std::cell::RefCell;
use std::panic;
use std::sync::Arc;
use std::thread::JoinHandle;

thread_local! {
    static CONTEXT: RefCell<Option<ExecutionContext>> = const { RefCell::new(None) };
}

/// Handles shared by every thread of one execution
#[derive(Clone)]
pub struct ExecutionContext {
    sink: Arc<dyn ConcurrencyEventSink>,
    hosts: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl ExecutionContext {
    /// Context reporting to `sink`
    pub fn new(sink: Arc<dyn ConcurrencyEventSink>) -> Self {
        Self {
            sink,
            hosts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Event sink of the execution
    pub fn sink(&self) -> &Arc<dyn ConcurrencyEventSink> {
        &self.sink
    }

    /// Remember a spawned host thread so the harness can join it
    pub fn adopt(&self, host: JoinHandle<()>) {
        self.hosts.lock().push(host);
    }

    /// Join every host thread spawned so far, including ones spawned while
    /// joining
    pub fn join_hosts(&self) {
        loop {
            let hosts: Vec<_> = std::mem::take(&mut *self.hosts.lock());
            if hosts.is_empty() {
                return;
            }
            for host in hosts {
                // Host threads catch test panics themselves
                let _ = host.join();
            }
        }
    }
}

/// Restores the previous context when dropped
pub struct ContextGuard {
    previous: Option<ExecutionContext>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CONTEXT.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// Install `cx` on the calling thread until the guard drops
pub fn enter(cx: ExecutionContext) -> ContextGuard {
    let previous = CONTEXT.with(|slot| slot.borrow_mut().replace(cx));
    ContextGuard { previous }
}

/// Context of the calling thread, if it belongs to an execution
pub fn current() -> Option<ExecutionContext> {
    CONTEXT.with(|slot| slot.borrow().clone())
}

/// Context of the calling thread; panics outside an execution
#[track_caller]
pub fn expect_current() -> ExecutionContext {
    match current() {
        Some(cx) => cx,
        None => panic!("krepis-interleave primitive used outside of a model run"),
    }
}

/// Unwind payload of threads stopped because the execution failed
///
/// Never reported as a test panic.
#[derive(Debug)]
pub struct Aborted(pub InterleaveError);

/// Unwind the calling thread after an execution failure
///
/// The failure is already recorded in the gate; this only stops the thread
/// without running the panic hook.
pub fn bail(err: InterleaveError) -> ! {
    panic::resume_unwind(Box::new(Aborted(err)))
}

/// Whether a caught panic payload is an [`Aborted`] marker
pub fn is_abort(payload: &(dyn Any + Send)) -> bool {
    payload.is::<Aborted>()
}

/// Render a panic payload as text
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(Aborted(err)) = payload.downcast_ref::<Aborted>() {
        err.to_string()
    } else {
        "non-string panic payload".to_string()
    }
}
