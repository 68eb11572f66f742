//! # Decision Tree
//!
//! Arena of decision points shared by every execution of one test. Nodes are
//! addressed by [`NodeId`]; parent links are indices, so walking back to the
//! root never fights the borrow checker and the tree owns no cycles.
//!
//! ```text
//! [0] root: "main @ a.rs:3" options [main, main.0]
//!  ├─ [1] chosen main     ── COMPLETELY_TESTED
//!  └─ [2] chosen main.0   ── UNTESTED
//! ```
//!
//! A node is COMPLETELY_TESTED once it has no options (an execution ended
//! there) or every child is; completion propagates to ancestors eagerly.

use crate::domain::thread::ThreadId;
use crate::error::{InterleaveError, InterleaveResult};
use std::fmt;

/// Index of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The root node, present in every tree
    pub const ROOT: NodeId = NodeId(0);

    /// Raw arena index
    #[inline(always)]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        NodeId::ROOT
    }
}

/// Exploration status of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    /// Never reached by an execution
    Untested,
    /// Reached, some children still open
    PartiallyTested,
    /// Every continuation below has been executed
    CompletelyTested,
}

impl NodeStatus {
    /// Check if no execution reached the node yet
    #[inline(always)]
    pub const fn is_untested(self) -> bool {
        matches!(self, NodeStatus::Untested)
    }

    /// Check if the subtree is exhausted
    #[inline(always)]
    pub const fn is_complete(self) -> bool {
        matches!(self, NodeStatus::CompletelyTested)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Untested => write!(f, "UNTESTED"),
            NodeStatus::PartiallyTested => write!(f, "PARTIALLY_TESTED"),
            NodeStatus::CompletelyTested => write!(f, "COMPLETELY_TESTED"),
        }
    }
}

/// One decision point
#[derive(Debug, Clone)]
pub struct DecisionNode {
    /// Parent decision point, `None` for the root
    pub parent: Option<NodeId>,
    /// Option of the parent that leads here
    pub chosen: Option<ThreadId>,
    /// Label recorded on the first visit
    pub label: Option<String>,
    /// Options recorded on the first visit, in offer order
    pub options: Vec<ThreadId>,
    /// One child per option, same order
    pub children: Vec<NodeId>,
    /// Exploration status
    pub status: NodeStatus,
}

impl DecisionNode {
    fn new(parent: Option<NodeId>, chosen: Option<ThreadId>) -> Self {
        Self {
            parent,
            chosen,
            label: None,
            options: Vec::new(),
            children: Vec::new(),
            status: NodeStatus::Untested,
        }
    }
}

/// Arena of decision points
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<DecisionNode>,
}

impl DecisionTree {
    /// A tree holding only an untested root
    pub fn new() -> Self {
        Self {
            nodes: vec![DecisionNode::new(None, None)],
        }
    }

    /// Node by id
    ///
    /// Ids are only ever produced by this tree, so lookups cannot miss.
    pub fn node(&self, id: NodeId) -> &DecisionNode {
        &self.nodes[id.0]
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always has its root
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether every execution has been tried
    pub fn is_completely_tested(&self) -> bool {
        self.node(NodeId::ROOT).status.is_complete()
    }

    /// Visit a decision point with the given label and options
    ///
    /// The first visit records them and creates the children. Later visits
    /// must offer exactly the same label and options.
    pub fn visit(&mut self, id: NodeId, label: &str, options: &[ThreadId]) -> InterleaveResult<()> {
        if self.node(id).status.is_untested() {
            let children: Vec<NodeId> = options
                .iter()
                .map(|option| {
                    self.nodes.push(DecisionNode::new(Some(id), Some(option.clone())));
                    NodeId(self.nodes.len() - 1)
                })
                .collect();

            let node = &mut self.nodes[id.0];
            node.label = Some(label.to_string());
            node.options = options.to_vec();
            node.children = children;
            node.status = NodeStatus::PartiallyTested;

            if options.is_empty() {
                self.complete(id);
            }
            return Ok(());
        }

        let node = self.node(id);
        if node.label.as_deref() != Some(label) || node.options != options {
            return Err(InterleaveError::NondeterministicExecution {
                depth: self.depth(id),
                expected: describe(node.label.as_deref().unwrap_or(""), &node.options),
                found: describe(label, options),
            });
        }
        Ok(())
    }

    /// First child whose subtree is still open, with its option index
    pub fn first_open_child(&self, id: NodeId) -> Option<(usize, NodeId)> {
        self.node(id)
            .children
            .iter()
            .enumerate()
            .find(|(_, child)| !self.node(**child).status.is_complete())
            .map(|(index, child)| (index, *child))
    }

    /// Mark `id` exhausted and propagate to ancestors whose children all are
    pub fn complete(&mut self, id: NodeId) {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &self.nodes[current.0];
            let done = node.children.iter().all(|child| self.nodes[child.0].status.is_complete());
            if !done {
                break;
            }
            self.nodes[current.0].status = NodeStatus::CompletelyTested;
            cursor = self.nodes[current.0].parent;
        }
    }

    /// Node ids from the root down to `id`
    pub fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            path.push(current);
            cursor = self.node(current).parent;
        }
        path.reverse();
        path
    }

    /// Distance of `id` from the root
    pub fn depth(&self, id: NodeId) -> usize {
        self.path(id).len() - 1
    }
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

fn describe(label: &str, options: &[ThreadId]) -> String {
    let names: Vec<&str> = options.iter().map(ThreadId::name).collect();
    format!("\"{}\" [{}]", label, names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<ThreadId> {
        let root = ThreadId::root();
        vec![root.clone(), ThreadId::child(&root, 0)]
    }

    #[test]
    fn test_first_visit_creates_children() {
        let mut tree = DecisionTree::new();
        tree.visit(NodeId::ROOT, "start", &options()).unwrap();

        let root = tree.node(NodeId::ROOT);
        assert_eq!(root.status, NodeStatus::PartiallyTested);
        assert_eq!(root.children.len(), 2);
        assert_eq!(tree.first_open_child(NodeId::ROOT).map(|(i, _)| i), Some(0));
        assert_eq!(tree.depth(root.children[1]), 1);
    }

    #[test]
    fn test_revisit_must_match() {
        let mut tree = DecisionTree::new();
        tree.visit(NodeId::ROOT, "start", &options()).unwrap();
        tree.visit(NodeId::ROOT, "start", &options()).unwrap();

        let err = tree.visit(NodeId::ROOT, "elsewhere", &options()).unwrap_err();
        assert!(matches!(err, InterleaveError::NondeterministicExecution { depth: 0, .. }));

        let err = tree.visit(NodeId::ROOT, "start", &options()[..1]).unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_completion_propagates() {
        let mut tree = DecisionTree::new();
        tree.visit(NodeId::ROOT, "start", &options()).unwrap();
        let (_, first) = tree.first_open_child(NodeId::ROOT).unwrap();

        tree.visit(first, "end", &[]).unwrap();
        assert!(tree.node(first).status.is_complete());
        assert!(!tree.is_completely_tested());

        let (index, second) = tree.first_open_child(NodeId::ROOT).unwrap();
        assert_eq!(index, 1);
        tree.complete(second);
        assert!(tree.is_completely_tested());
        assert_eq!(tree.path(second), vec![NodeId::ROOT, second]);
    }
}
