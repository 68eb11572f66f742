//! Join Tracker
//!
//! Multimap from a thread to the threads blocked until it terminates.

use crate::domain::thread::ThreadId;
use std::collections::{BTreeSet, HashMap};

/// Threads blocked in `join`, keyed by the thread they wait for
#[derive(Debug, Default)]
pub struct JoinTracker {
    joiners: HashMap<ThreadId, BTreeSet<ThreadId>>,
}

impl JoinTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `joiner` waits for `joinee`
    pub fn add(&mut self, joinee: ThreadId, joiner: ThreadId) {
        self.joiners.entry(joinee).or_default().insert(joiner);
    }

    /// `joinee` terminated: every thread waiting on it, in lineage order
    pub fn release(&mut self, joinee: &ThreadId) -> Vec<ThreadId> {
        self.joiners
            .remove(joinee)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default()
    }

    /// Threads currently waiting on `joinee`
    pub fn joiners_of(&self, joinee: &ThreadId) -> Vec<ThreadId> {
        self.joiners
            .get(joinee)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether `joiner` is blocked in any join
    pub fn is_joining(&self, joiner: &ThreadId) -> bool {
        self.joiners.values().any(|set| set.contains(joiner))
    }

    /// Whether nobody is joining
    pub fn is_empty(&self) -> bool {
        self.joiners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_returns_all_joiners() {
        let root = ThreadId::root();
        let a = ThreadId::child(&root, 0);
        let b = ThreadId::child(&root, 1);

        let mut joins = JoinTracker::new();
        joins.add(b.clone(), root.clone());
        joins.add(b.clone(), a.clone());
        assert!(joins.is_joining(&a));
        assert_eq!(joins.joiners_of(&b).len(), 2);

        assert_eq!(joins.release(&b), vec![root, a.clone()]);
        assert!(joins.release(&b).is_empty());
        assert!(!joins.is_joining(&a));
        assert!(joins.is_empty());
    }
}
