//! Infrastructure Layer - host threads meet the model
//!
//! - `sink`: the event feed contract
//! - `gate`: the thread-safe scheduler implementing it
//! - `context`: thread-local access to the current execution

pub mod context;
pub mod gate;
pub mod sink;

pub use context::ExecutionContext;
pub use gate::{HostThreadId, Scheduler};
pub use sink::ConcurrencyEventSink;
