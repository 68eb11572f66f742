//! Synchronization Model
//!
//! - `monitor`: [`LockId`] and the per-lock [`Monitor`] record
//! - `tracker`: lock/wait/notify events to blocked/unblocked transitions
//! - `join`: who waits for whose termination

pub mod join;
pub mod monitor;
pub mod tracker;

pub use join::JoinTracker;
pub use monitor::{LockId, Monitor};
pub use tracker::{SynchronizationTracker, Transition};
