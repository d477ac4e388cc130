//! Network nodes and their connection policies.
//!
//! All three node kinds share one struct; the only behavioral difference
//! between them is [`Node::can_add`].

use std::collections::BTreeSet;

use super::types::{NodeId, NodeKind};

/// A node owned by a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    kind: NodeKind,
    identifier: Option<String>,
    capacity: usize,
    neighbors: BTreeSet<NodeId>,
}

impl Node {
    pub(crate) fn endpoint() -> Self {
        Self {
            kind: NodeKind::Endpoint,
            identifier: None,
            capacity: 1,
            neighbors: BTreeSet::new(),
        }
    }

    pub(crate) fn named(kind: NodeKind, capacity: usize, identifier: &str) -> Self {
        debug_assert!(kind.is_named());
        Self {
            kind,
            identifier: Some(identifier.to_string()),
            capacity,
            neighbors: BTreeSet::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Caller-supplied identifier; `None` for endpoints.
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current neighbors, ordered by handle.
    pub fn neighbors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.neighbors.iter().copied()
    }

    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_connected_to(&self, other: NodeId) -> bool {
        self.neighbors.contains(&other)
    }

    /// Connection policy: may `other` be added as a neighbor of this node?
    ///
    /// Only looks at this node's side. `connect` requires the check to pass
    /// in both directions.
    pub fn can_add(&self, other: NodeId) -> bool {
        match self.kind {
            NodeKind::Endpoint => self.neighbors.is_empty(),
            NodeKind::Bridge => {
                !self.neighbors.contains(&other) && self.neighbors.len() < self.capacity
            }
            NodeKind::Router => {
                // one link per segment, own segment included
                !self.neighbors.iter().any(|n| n.segment == other.segment)
                    && self.neighbors.len() < self.capacity
            }
        }
    }

    pub(crate) fn attach(&mut self, other: NodeId) {
        self.neighbors.insert(other);
        debug_assert!(self.neighbors.len() <= self.capacity);
    }

    pub(crate) fn detach(&mut self, other: NodeId) -> bool {
        self.neighbors.remove(&other)
    }

    /// Drop every neighbor matching the predicate, returning the removed ones.
    pub(crate) fn detach_where(&mut self, mut pred: impl FnMut(NodeId) -> bool) -> Vec<NodeId> {
        let removed: Vec<NodeId> = self.neighbors.iter().copied().filter(|&n| pred(n)).collect();
        for n in &removed {
            self.neighbors.remove(n);
        }
        removed
    }
}
