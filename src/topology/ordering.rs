//! Canonical node ordering.
//!
//! Nodes have no inherent total order, yet every listing that ends up in the
//! text format must be a function of graph state alone. The order is:
//!
//! 1. kind: endpoint < bridge < router
//! 2. bridges and routers: identifier, then segment rank
//! 3. endpoints: degree, neighbor kind, neighbor segment rank, neighbor
//!    identifier, own segment rank, own arena index
//!
//! Segment rank is supplied by the caller so the encoder can order segments
//! the way it was asked to.

use std::cmp::Ordering;

use super::types::{NodeId, NodeKind, SegmentId};
use super::Topology;

/// Sort key realizing the canonical order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CanonicalKey<'a> {
    kind: NodeKind,
    detail: KeyDetail<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum KeyDetail<'a> {
    Endpoint {
        degree: usize,
        peer_kind: Option<NodeKind>,
        peer_rank: Option<usize>,
        peer_identifier: Option<&'a str>,
        segment_rank: usize,
        index: usize,
    },
    Named {
        identifier: &'a str,
        segment_rank: usize,
    },
}

/// Compute the canonical key of `id`, or `None` if it does not resolve.
pub fn canonical_key<'a, R>(topology: &'a Topology, id: NodeId, rank: &R) -> Option<CanonicalKey<'a>>
where
    R: Fn(SegmentId) -> usize,
{
    let node = topology.node(id)?;
    let detail = match node.identifier() {
        Some(identifier) => KeyDetail::Named {
            identifier,
            segment_rank: rank(id.segment),
        },
        None => {
            let peer = node.neighbors().next();
            let peer_node = peer.and_then(|p| topology.node(p));
            KeyDetail::Endpoint {
                degree: node.degree(),
                peer_kind: peer_node.map(|p| p.kind()),
                peer_rank: peer.map(|p| rank(p.segment)),
                peer_identifier: peer_node.and_then(|p| p.identifier()),
                segment_rank: rank(id.segment),
                index: id.index,
            }
        }
    };
    Some(CanonicalKey { kind: node.kind(), detail })
}

/// Compare two nodes in canonical order, ranking segments by creation order.
/// Unresolvable handles sort after every live node.
pub fn node_cmp(topology: &Topology, a: NodeId, b: NodeId) -> Ordering {
    let rank = |s: SegmentId| s.index();
    match (canonical_key(topology, a, &rank), canonical_key(topology, b, &rank)) {
        (Some(ka), Some(kb)) => ka.cmp(&kb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(&b),
    }
}

/// Sort handles in canonical order under the given segment ranking.
pub fn sort_canonical<R>(topology: &Topology, ids: &mut [NodeId], rank: &R)
where
    R: Fn(SegmentId) -> usize,
{
    ids.sort_by(|&a, &b| {
        match (canonical_key(topology, a, rank), canonical_key(topology, b, rank)) {
            (Some(ka), Some(kb)) => ka.cmp(&kb),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(&b),
        }
    });
}
