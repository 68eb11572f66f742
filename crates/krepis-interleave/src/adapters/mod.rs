//! Adapters Layer - cooperative primitives for test code
//!
//! Tests written against these modules instead of `std::thread` and
//! `std::sync::Mutex` produce the event feed of a model run.

pub mod sync;
pub mod thread;
