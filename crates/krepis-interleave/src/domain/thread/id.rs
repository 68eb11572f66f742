//! Structural Thread Identity
//!
//! A [`ThreadId`] is derived from the spawn lineage of a logical thread: its
//! parent's identity plus the number of children the parent had spawned
//! before it. Host thread identities change on every execution, lineage does
//! not, so the *n*-th thread of a deterministic test has the same `ThreadId`
//! in every run.
//!
//! ```text
//! main            lineage [0]
//! ├─ main.0       lineage [0, 0]
//! │  └─ main.0.0  lineage [0, 0, 0]
//! └─ main.1       lineage [0, 1]
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Name given to the root thread of every execution
pub const ROOT_THREAD_NAME: &str = "main";

/// Reproducible identity of a logical thread
///
/// Equality, hashing and ordering only look at the lineage (parent chain and
/// sequence numbers). The display name is informational.
///
/// Cloning is an `Arc` bump, so ids are cheap to use as map keys.
#[derive(Clone)]
pub struct ThreadId(Arc<Lineage>);

struct Lineage {
    parent: Option<ThreadId>,
    seq: usize,
    name: String,
}

impl ThreadId {
    /// Identity of the thread that runs the test closure
    pub fn root() -> Self {
        Self(Arc::new(Lineage {
            parent: None,
            seq: 0,
            name: ROOT_THREAD_NAME.to_string(),
        }))
    }

    /// Identity of the `seq`-th child spawned by `parent`
    ///
    /// # Example
    ///
    /// ```rust
    /// use krepis_interleave::domain::thread::ThreadId;
    ///
    /// let root = ThreadId::root();
    /// let first = ThreadId::child(&root, 0);
    ///
    /// assert_eq!(first, ThreadId::child(&ThreadId::root(), 0));
    /// assert_eq!(first.to_string(), "main.0");
    /// ```
    pub fn child(parent: &ThreadId, seq: usize) -> Self {
        let name = format!("{}.{}", parent.name(), seq);
        Self::named(parent, seq, name)
    }

    /// Child identity with a caller-chosen display name
    pub fn named(parent: &ThreadId, seq: usize, name: impl Into<String>) -> Self {
        Self(Arc::new(Lineage {
            parent: Some(parent.clone()),
            seq,
            name: name.into(),
        }))
    }

    /// Parent identity, `None` for the root
    pub fn parent(&self) -> Option<&ThreadId> {
        self.0.parent.as_ref()
    }

    /// How many siblings were spawned before this thread
    pub fn seq(&self) -> usize {
        self.0.seq
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Whether this is the root thread of an execution
    pub fn is_root(&self) -> bool {
        self.0.parent.is_none()
    }

    /// Number of ancestors, 0 for the root
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cursor = self.parent();
        while let Some(id) = cursor {
            depth += 1;
            cursor = id.parent();
        }
        depth
    }

    /// Ancestor `levels` generations up (`self` for 0)
    fn ancestor(&self, levels: usize) -> &ThreadId {
        let mut id = self;
        for _ in 0..levels {
            match id.parent() {
                Some(parent) => id = parent,
                None => break,
            }
        }
        id
    }

    /// Sequence numbers from the root down to this thread
    pub fn lineage(&self) -> Vec<usize> {
        let mut path = Vec::new();
        let mut cursor = Some(self);
        while let Some(id) = cursor {
            path.push(id.0.seq);
            cursor = id.0.parent.as_ref();
        }
        path.reverse();
        path
    }
}

impl PartialEq for ThreadId {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.seq == other.0.seq && self.0.parent == other.0.parent)
    }
}

impl Eq for ThreadId {}

impl Hash for ThreadId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.parent.hash(state);
        self.0.seq.hash(state);
    }
}

impl PartialOrd for ThreadId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lexicographic order of the lineages, walked in place
///
/// The deeper id is lifted to the other's depth, then both chains are
/// climbed together. The topmost differing sequence number decides; when
/// none differs the shallower id is a prefix and sorts first.
impl Ord for ThreadId {
    fn cmp(&self, other: &Self) -> Ordering {
        let (depth, other_depth) = (self.depth(), other.depth());
        let common = depth.min(other_depth);

        let mut order = Ordering::Equal;
        let mut a = Some(self.ancestor(depth - common));
        let mut b = Some(other.ancestor(other_depth - common));
        while let (Some(x), Some(y)) = (a, b) {
            if Arc::ptr_eq(&x.0, &y.0) {
                break;
            }
            if x.0.seq != y.0.seq {
                order = x.0.seq.cmp(&y.0.seq);
            }
            a = x.parent();
            b = y.parent();
        }

        order.then(depth.cmp(&other_depth))
    }
}

impl fmt::Debug for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ThreadId({})", self.0.name)
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}
