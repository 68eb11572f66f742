//! Domain Layer - pure scheduling model
//!
//! No host threads, locks or condition variables live here; everything in
//! this layer is single-threaded and driven by the gate in
//! [`infrastructure`](crate::infrastructure).

pub mod explorer;
pub mod scheduler;
pub mod sync;
pub mod thread;
