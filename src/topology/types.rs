//! Topology type definitions.
//!
//! Identifiers for segments and nodes, and the closed set of node kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a network node. The derived ordering (endpoint < bridge < router)
/// is the first level of the canonical node order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Leaf node with a single port
    Endpoint,
    /// Multi-port node with no segment restriction
    Bridge,
    /// Multi-port node holding at most one link per segment
    Router,
}

impl NodeKind {
    /// Prefix used for node references in the text format.
    pub fn ref_prefix(self) -> &'static str {
        match self {
            NodeKind::Endpoint => "e_",
            NodeKind::Bridge => "b_",
            NodeKind::Router => "r_",
        }
    }

    /// Keyword used in the `type=` field of the text format.
    pub fn keyword(self) -> &'static str {
        match self {
            NodeKind::Endpoint => "endpoint",
            NodeKind::Bridge => "bridge",
            NodeKind::Router => "router",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "endpoint" => Some(NodeKind::Endpoint),
            "bridge" => Some(NodeKind::Bridge),
            "router" => Some(NodeKind::Router),
            _ => None,
        }
    }

    /// Returns true for kinds that carry a caller-supplied identifier
    pub fn is_named(self) -> bool {
        !matches!(self, NodeKind::Endpoint)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Stable handle of a segment within its [`Topology`](super::Topology).
/// Ids are handed out in creation order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId(pub(crate) usize);

impl SegmentId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle of a node: the owning segment plus the arena slot inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    pub segment: SegmentId,
    pub(crate) index: usize,
}

impl NodeId {
    pub(crate) fn new(segment: SegmentId, index: usize) -> Self {
        Self { segment, index }
    }

    /// Position of the node in its segment's arena (creation order).
    pub fn index(self) -> usize {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.segment, self.index)
    }
}
