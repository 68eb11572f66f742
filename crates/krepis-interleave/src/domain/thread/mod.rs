//! Thread Model
//!
//! - `id`: structural, reproducible [`ThreadId`]
//! - `registry`: host handle ↔ `ThreadId` mapping per execution
//! - `state`: RUNNING / BLOCKED / RUNNABLE table

pub mod id;
pub mod registry;
pub mod state;

pub use id::{ThreadId, ROOT_THREAD_NAME};
pub use registry::ThreadRegistry;
pub use state::{BlockReason, RunState, ThreadStates};
