//! # Thread Registry
//!
//! Bidirectional map between host thread handles and [`ThreadId`]s, created
//! fresh for every execution. Lookups of an unregistered handle fail with
//! [`InterleaveError::UntrackedThread`]; the event producer must register
//! every thread before reporting events for it.
//!
//! Every operation takes `&self`. Inside [`SchedulerState`](crate::SchedulerState)
//! the gate's lock already serializes access; a registry shared on its own
//! (behind an `Arc`) can be fed from several host threads at once.

use super::id::ThreadId;
use crate::error::{InterleaveError, InterleaveResult};
use dashmap::DashMap;
use std::fmt;
use std::hash::Hash;

/// Host handle ↔ logical thread mapping for one execution
pub struct ThreadRegistry<H>
where
    H: Eq + Hash + Clone,
{
    /// Host handle -> logical id
    by_host: DashMap<H, ThreadId>,

    /// Logical id -> host handle (only once the host thread is bound)
    by_id: DashMap<ThreadId, H>,

    /// Children spawned so far, per parent
    spawned: DashMap<ThreadId, usize>,
}

impl<H> ThreadRegistry<H>
where
    H: Eq + Hash + Clone + fmt::Debug,
{
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            by_host: DashMap::new(),
            by_id: DashMap::new(),
            spawned: DashMap::new(),
        }
    }

    /// Allocate an id for `host` and bind it in one step
    ///
    /// A missing `parent` creates the root identity.
    pub fn create(&self, host: H, parent: Option<&ThreadId>) -> ThreadId {
        let id = self.allocate(parent);
        self.bind(host, &id);
        id
    }

    /// Allocate the next child identity of `parent` without a host handle
    ///
    /// Used when the parent announces a child before the child's host thread
    /// exists. The child binds itself later with [`bind`](Self::bind).
    pub fn allocate(&self, parent: Option<&ThreadId>) -> ThreadId {
        match parent {
            None => ThreadId::root(),
            Some(parent) => {
                let seq = {
                    let mut count = self.spawned.entry(parent.clone()).or_insert(0);
                    let seq = *count;
                    *count += 1;
                    seq
                };
                ThreadId::child(parent, seq)
            }
        }
    }

    /// Associate a host handle with an allocated id
    pub fn bind(&self, host: H, id: &ThreadId) {
        self.by_host.insert(host.clone(), id.clone());
        self.by_id.insert(id.clone(), host);
    }

    /// Logical id of a host thread
    pub fn id_for(&self, host: &H) -> InterleaveResult<ThreadId> {
        self.by_host
            .get(host)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| InterleaveError::UntrackedThread(format!("host thread {:?}", host)))
    }

    /// Host handle bound to a logical id
    pub fn thread_for(&self, id: &ThreadId) -> InterleaveResult<H> {
        self.by_id
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| InterleaveError::UntrackedThread(id.to_string()))
    }

    /// Remove both mappings of a terminating host thread
    pub fn terminate(&self, host: &H) -> InterleaveResult<ThreadId> {
        let (_, id) = self
            .by_host
            .remove(host)
            .ok_or_else(|| InterleaveError::UntrackedThread(format!("host thread {:?}", host)))?;
        self.by_id.remove(&id);
        self.spawned.remove(&id);
        Ok(id)
    }

    /// Drop every trace of `id`, bound or not
    pub fn forget(&self, id: &ThreadId) -> Option<H> {
        self.spawned.remove(id);
        let (_, host) = self.by_id.remove(id)?;
        self.by_host.remove(&host);
        Some(host)
    }

    /// Whether `id` has a bound host thread
    pub fn is_bound(&self, id: &ThreadId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Number of bound threads
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether no thread is bound
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl<H> Default for ThreadRegistry<H>
where
    H: Eq + Hash + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
