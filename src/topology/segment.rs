//! Network segments.
//!
//! A segment owns its nodes in an arena and runs the graph algorithms that
//! only concern edges internal to the segment (loop detection and repair).

use std::collections::{BTreeMap, HashSet};

use log::debug;

use super::node::Node;
use super::types::{NodeId, NodeKind, SegmentId};
use crate::error::{Result, TopologyError};

/// One routing domain: an exclusive-ownership container of nodes.
#[derive(Debug, Clone)]
pub struct Segment {
    id: SegmentId,
    nodes: Vec<Node>,
    bridges: BTreeMap<String, usize>,
    routers: BTreeMap<String, usize>,
}

/// Check that an identifier is a non-empty run of ASCII letters and digits
pub fn validate_identifier(id: &str) -> Result<()> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(TopologyError::InvalidIdentifier(id.to_string()));
    }
    Ok(())
}

impl Segment {
    pub(crate) fn new(id: SegmentId) -> Self {
        Self {
            id,
            nodes: Vec::new(),
            bridges: BTreeMap::new(),
            routers: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// Create an unconnected endpoint owned by this segment.
    pub fn add_endpoint(&mut self) -> NodeId {
        self.push(Node::endpoint())
    }

    /// Create a bridge with `capacity` ports.
    pub fn add_bridge(&mut self, capacity: usize, id: &str) -> Result<NodeId> {
        self.add_named(NodeKind::Bridge, capacity, id)
    }

    /// Create a router with `capacity` interfaces.
    pub fn add_router(&mut self, capacity: usize, id: &str) -> Result<NodeId> {
        self.add_named(NodeKind::Router, capacity, id)
    }

    fn add_named(&mut self, kind: NodeKind, capacity: usize, id: &str) -> Result<NodeId> {
        validate_identifier(id)?;
        if capacity == 0 {
            return Err(TopologyError::InvalidCapacity(capacity));
        }
        let index = self.nodes.len();
        let registry = match kind {
            NodeKind::Bridge => &mut self.bridges,
            NodeKind::Router => &mut self.routers,
            NodeKind::Endpoint => unreachable!("endpoints carry no identifier"),
        };
        if registry.contains_key(id) {
            return Err(TopologyError::DuplicateIdentifier { kind, id: id.to_string() });
        }
        registry.insert(id.to_string(), index);
        Ok(self.push(Node::named(kind, capacity, id)))
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.id, self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        if id.segment != self.id {
            return None;
        }
        self.nodes.get(id.index)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.segment != self.id {
            return None;
        }
        self.nodes.get_mut(id.index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes with their handles, in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        let segment = self.id;
        self.nodes
            .iter()
            .enumerate()
            .map(move |(index, node)| (NodeId::new(segment, index), node))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Node> + '_ {
        self.nodes.iter_mut()
    }

    /// Endpoints in creation order. Use
    /// [`Topology::sorted_nodes`](super::Topology::sorted_nodes) for the
    /// canonical order, which depends on neighbors outside this segment.
    pub fn endpoints(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, n)| n.kind() == NodeKind::Endpoint)
            .map(|(id, _)| id)
            .collect()
    }

    /// Bridges ordered by identifier.
    pub fn bridges(&self) -> Vec<NodeId> {
        self.bridges.values().map(|&i| NodeId::new(self.id, i)).collect()
    }

    /// Routers ordered by identifier.
    pub fn routers(&self) -> Vec<NodeId> {
        self.routers.values().map(|&i| NodeId::new(self.id, i)).collect()
    }

    pub fn find_bridge(&self, id: &str) -> Option<NodeId> {
        self.bridges.get(id).map(|&i| NodeId::new(self.id, i))
    }

    pub fn find_router(&self, id: &str) -> Option<NodeId> {
        self.routers.get(id).map(|&i| NodeId::new(self.id, i))
    }

    /// Look up a named node by kind and identifier.
    pub fn find(&self, kind: NodeKind, id: &str) -> Option<NodeId> {
        match kind {
            NodeKind::Bridge => self.find_bridge(id),
            NodeKind::Router => self.find_router(id),
            NodeKind::Endpoint => None,
        }
    }

    /// Count of nodes of the given kind.
    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|n| n.kind() == kind).count()
    }

    /// Number of edges with both ends in this segment.
    pub fn internal_edge_count(&self) -> usize {
        let ends: usize = self
            .nodes
            .iter()
            .map(|n| n.neighbors().filter(|m| m.segment == self.id).count())
            .sum();
        ends / 2
    }

    /// Neighbors of `index` living in this segment, as arena indices.
    fn local_neighbors(&self, index: usize) -> Vec<usize> {
        self.nodes[index]
            .neighbors()
            .filter(|n| n.segment == self.id)
            .map(|n| n.index)
            .collect()
    }

    /// Depth-first search from `start` over same-segment edges. Returns the
    /// first non-tree edge found; every such edge lies on a cycle. All nodes
    /// reached are added to `visited`.
    fn find_cycle(&self, start: usize, visited: &mut HashSet<usize>) -> Option<(usize, usize)> {
        struct Frame {
            node: usize,
            parent: Option<usize>,
            neighbors: Vec<usize>,
            next: usize,
        }

        visited.insert(start);
        let mut stack = vec![Frame {
            node: start,
            parent: None,
            neighbors: self.local_neighbors(start),
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(candidate) = frame.neighbors.get(frame.next).copied() else {
                stack.pop();
                continue;
            };
            frame.next += 1;
            if Some(candidate) == frame.parent {
                continue;
            }
            if visited.contains(&candidate) {
                return Some((frame.node, candidate));
            }
            visited.insert(candidate);
            let current = frame.node;
            stack.push(Frame {
                node: candidate,
                parent: Some(current),
                neighbors: self.local_neighbors(candidate),
                next: 0,
            });
        }
        None
    }

    /// Returns true if the edges internal to this segment form a cycle.
    /// Edges leaving the segment are not considered.
    pub fn has_loops(&self) -> bool {
        let mut visited = HashSet::new();
        (0..self.nodes.len()).any(|start| {
            !visited.contains(&start) && self.find_cycle(start, &mut visited).is_some()
        })
    }

    /// Remove same-segment edges until the segment is acyclic, returning how
    /// many edges were removed. Only cycle edges are removed, so every pair
    /// of nodes that could reach each other still can.
    pub fn fix_loops(&mut self) -> usize {
        let mut visited = HashSet::new();
        let mut removed = 0;
        for start in 0..self.nodes.len() {
            if visited.contains(&start) {
                continue;
            }
            loop {
                let mut component = HashSet::new();
                match self.find_cycle(start, &mut component) {
                    Some((a, b)) => {
                        let (a, b) = (NodeId::new(self.id, a), NodeId::new(self.id, b));
                        debug!("Breaking loop in segment {} by removing edge {} - {}", self.id, a, b);
                        self.disconnect_local(a, b);
                        removed += 1;
                    }
                    None => {
                        visited.extend(component);
                        break;
                    }
                }
            }
        }
        removed
    }

    fn disconnect_local(&mut self, a: NodeId, b: NodeId) {
        let left = self.nodes[a.index].detach(b);
        let right = self.nodes[b.index].detach(a);
        debug_assert!(left && right, "asymmetric edge {} - {}", a, b);
    }
}
