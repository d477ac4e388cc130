//! Network topology module.
//!
//! A [`Topology`] owns an ordered collection of [`Segment`]s. Operations
//! whose two sides may live in different segments (connect, disconnect,
//! reachability, segment removal) are hosted here; operations confined to a
//! single segment live on [`Segment`].

pub mod node;
pub mod ordering;
pub mod segment;
pub mod types;

use std::collections::{HashSet, VecDeque};

use log::{debug, info};

// Re-export key types for easier access
pub use node::Node;
pub use ordering::{canonical_key, node_cmp, sort_canonical, CanonicalKey};
pub use segment::{validate_identifier, Segment};
pub use types::{NodeId, NodeKind, SegmentId};

/// Owner of all segments and of every edge between them.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    segments: Vec<Option<Segment>>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty segment at the end of the ordering.
    pub fn add_segment(&mut self) -> SegmentId {
        let id = SegmentId(self.segments.len());
        self.segments.push(Some(Segment::new(id)));
        id
    }

    /// Destroy a segment and all of its nodes.
    ///
    /// Every edge from a surviving node into the removed segment is dropped
    /// first, so no neighbor set ever refers to a destroyed node.
    pub fn remove_segment(&mut self, id: SegmentId) -> bool {
        let Some(segment) = self.segments.get_mut(id.0).and_then(Option::take) else {
            return false;
        };
        let mut detached = 0;
        for other in self.segments.iter_mut().flatten() {
            for node in other.iter_mut() {
                detached += node.detach_where(|n| n.segment == id).len();
            }
        }
        info!(
            "Removed segment {} ({} nodes, {} foreign links detached)",
            id,
            segment.len(),
            detached
        );
        true
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id.0).and_then(Option::as_ref)
    }

    pub fn segment_mut(&mut self, id: SegmentId) -> Option<&mut Segment> {
        self.segments.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Live segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> + '_ {
        self.segments.iter().flatten()
    }

    pub fn segment_ids(&self) -> Vec<SegmentId> {
        self.segments().map(Segment::id).collect()
    }

    pub fn segment_count(&self) -> usize {
        self.segments().count()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.segment(id.segment)?.node(id)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.segment_mut(id.segment)?.node_mut(id)
    }

    /// Nodes of one kind in a segment, in canonical order.
    ///
    /// [`Segment`] listings cannot give this order for endpoints, since it
    /// depends on neighbors that may live in other segments.
    pub fn sorted_nodes(&self, segment: SegmentId, kind: NodeKind) -> Vec<NodeId> {
        let Some(seg) = self.segment(segment) else {
            return Vec::new();
        };
        let mut ids: Vec<NodeId> = match kind {
            NodeKind::Endpoint => seg.endpoints(),
            NodeKind::Bridge => seg.bridges(),
            NodeKind::Router => seg.routers(),
        };
        sort_canonical(self, &mut ids, &|s: SegmentId| s.index());
        ids
    }

    /// Connect two nodes.
    ///
    /// Succeeds only if both handles resolve, they are distinct, and each
    /// node's policy accepts the other. Returns false otherwise and leaves
    /// the graph untouched.
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return false;
        }
        let accepted = match (self.node(a), self.node(b)) {
            (Some(na), Some(nb)) => na.can_add(b) && nb.can_add(a),
            _ => false,
        };
        if !accepted {
            return false;
        }
        if let Some(na) = self.node_mut(a) {
            na.attach(b);
        }
        if let Some(nb) = self.node_mut(b) {
            nb.attach(a);
        }
        true
    }

    /// Disconnect two nodes. Returns false if they were not connected.
    pub fn disconnect(&mut self, a: NodeId, b: NodeId) -> bool {
        let connected = match (self.node(a), self.node(b)) {
            (Some(na), Some(nb)) => na.is_connected_to(b) && nb.is_connected_to(a),
            _ => false,
        };
        if !connected {
            return false;
        }
        if let Some(na) = self.node_mut(a) {
            na.detach(b);
        }
        if let Some(nb) = self.node_mut(b) {
            nb.detach(a);
        }
        true
    }

    /// Returns true if a path of connections leads from `from` to `to`,
    /// crossing segment boundaries freely. Every live node reaches itself.
    pub fn reachable(&self, from: NodeId, to: NodeId) -> bool {
        if self.node(from).is_none() || self.node(to).is_none() {
            return false;
        }
        if from == to {
            return true;
        }
        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            let Some(node) = self.node(current) else { continue };
            for next in node.neighbors() {
                if next == to {
                    return true;
                }
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }

    /// Returns true if any segment has a same-segment cycle.
    pub fn has_loops(&self) -> bool {
        self.segments().any(Segment::has_loops)
    }

    /// Fix loops in every segment, returning the total number of removed edges.
    pub fn fix_loops(&mut self) -> usize {
        let mut removed = 0;
        for segment in self.segments.iter_mut().flatten() {
            let n = segment.fix_loops();
            if n > 0 {
                debug!("Removed {} loop edges from segment {}", n, segment.id());
            }
            removed += n;
        }
        removed
    }

    /// All edges as ordered pairs `(a, b)` with `a < b`.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        let mut edges = Vec::new();
        for segment in self.segments() {
            for (id, node) in segment.iter() {
                edges.extend(node.neighbors().filter(|&n| id < n).map(|n| (id, n)));
            }
        }
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariants(topo: &Topology) {
        for segment in topo.segments() {
            for (id, node) in segment.iter() {
                assert!(node.degree() <= node.capacity(), "{} over capacity", id);
                let mut seen = HashSet::new();
                for n in node.neighbors() {
                    let other = topo.node(n).expect("dangling neighbor");
                    assert!(other.is_connected_to(id), "asymmetric edge {} - {}", id, n);
                    if node.kind() == NodeKind::Router {
                        assert!(seen.insert(n.segment), "router {} has two links into {}", id, n.segment);
                    }
                }
            }
        }
    }

    #[test]
    fn test_scenario_bridge_with_two_endpoints() {
        let mut topo = Topology::new();
        let s = topo.add_segment();
        let seg = topo.segment_mut(s).unwrap();
        let bridge = seg.add_bridge(2, "br").unwrap();
        let e1 = seg.add_endpoint();
        let e2 = seg.add_endpoint();

        assert!(topo.connect(bridge, e1));
        assert!(topo.connect(bridge, e2));
        assert!(topo.reachable(e1, e2));
        assert!(topo.disconnect(bridge, e1));
        assert!(!topo.reachable(e1, e2));
        assert_invariants(&topo);
    }

    #[test]
    fn test_scenario_triangle_of_bridges() {
        let mut topo = Topology::new();
        let s = topo.add_segment();
        let seg = topo.segment_mut(s).unwrap();
        let a = seg.add_bridge(2, "A").unwrap();
        let b = seg.add_bridge(2, "B").unwrap();
        let c = seg.add_bridge(2, "C").unwrap();
        assert!(topo.connect(a, b));
        assert!(topo.connect(b, c));
        assert!(topo.connect(c, a));
        assert!(topo.segment(s).unwrap().has_loops());

        assert_eq!(topo.segment_mut(s).unwrap().fix_loops(), 1);
        let seg = topo.segment(s).unwrap();
        assert!(!seg.has_loops());
        assert_eq!(seg.internal_edge_count(), 2);
        for (x, y) in [(a, b), (b, c), (c, a)] {
            assert!(topo.reachable(x, y));
        }
        assert_invariants(&topo);
    }

    #[test]
    fn test_scenario_routers_across_segments() {
        let mut topo = Topology::new();
        let s1 = topo.add_segment();
        let s2 = topo.add_segment();
        let r1 = topo.segment_mut(s1).unwrap().add_router(1, "r1").unwrap();
        let e1 = topo.segment_mut(s1).unwrap().add_endpoint();
        let r2 = topo.segment_mut(s2).unwrap().add_router(2, "r2").unwrap();
        let e2 = topo.segment_mut(s2).unwrap().add_endpoint();

        assert!(topo.connect(r1, r2));
        // r1 has a single interface, already used
        assert!(!topo.connect(e1, r1));
        assert!(topo.connect(e2, r2));

        let b1 = topo.segment_mut(s1).unwrap().add_bridge(2, "b1").unwrap();
        assert!(topo.disconnect(r1, r2));
        let r1b = topo.segment_mut(s1).unwrap().add_router(2, "r1b").unwrap();
        assert!(topo.connect(r1b, r2));
        assert!(topo.connect(r1b, b1));
        assert!(topo.connect(b1, e1));

        assert!(topo.reachable(e1, e2));
        assert!(!topo.segment(s1).unwrap().has_loops());
        assert!(!topo.segment(s2).unwrap().has_loops());
        assert_invariants(&topo);
    }

    #[test]
    fn test_scenario_router_segment_conflict() {
        let mut topo = Topology::new();
        let s1 = topo.add_segment();
        let s2 = topo.add_segment();
        let r = topo.segment_mut(s1).unwrap().add_router(4, "r").unwrap();
        let x = topo.segment_mut(s2).unwrap().add_endpoint();
        let y = topo.segment_mut(s2).unwrap().add_bridge(3, "y").unwrap();

        assert!(topo.connect(r, x));
        let before: Vec<NodeId> = topo.node(r).unwrap().neighbors().collect();
        assert!(!topo.connect(r, y));
        assert!(!topo.connect(y, r));
        let after: Vec<NodeId> = topo.node(r).unwrap().neighbors().collect();
        assert_eq!(before, after);
        assert_invariants(&topo);
    }

    #[test]
    fn test_connect_rejections() {
        let mut topo = Topology::new();
        let s = topo.add_segment();
        let seg = topo.segment_mut(s).unwrap();
        let e = seg.add_endpoint();
        let b = seg.add_bridge(1, "b").unwrap();
        let other = seg.add_endpoint();

        assert!(!topo.connect(e, e));
        assert!(topo.connect(e, b));
        assert!(!topo.connect(e, b));
        assert!(!topo.connect(b, e));
        // bridge is full
        assert!(!topo.connect(other, b));
        // disconnect of unconnected pair
        assert!(!topo.disconnect(other, b));
        assert!(topo.disconnect(b, e));
        assert!(!topo.disconnect(b, e));
    }

    #[test]
    fn test_connect_is_symmetric() {
        let build = |swap: bool| {
            let mut topo = Topology::new();
            let s = topo.add_segment();
            let seg = topo.segment_mut(s).unwrap();
            let b = seg.add_bridge(1, "b").unwrap();
            let r = seg.add_router(2, "r").unwrap();
            let e = seg.add_endpoint();
            let results = if swap {
                vec![topo.connect(r, b), topo.connect(e, b), topo.connect(e, r)]
            } else {
                vec![topo.connect(b, r), topo.connect(b, e), topo.connect(r, e)]
            };
            (results, topo.edges())
        };
        assert_eq!(build(false), build(true));
    }

    #[test]
    fn test_reachable_reflexive_and_symmetric() {
        let mut topo = Topology::new();
        let s = topo.add_segment();
        let seg = topo.segment_mut(s).unwrap();
        let a = seg.add_endpoint();
        let b = seg.add_endpoint();
        let c = seg.add_endpoint();
        assert!(topo.connect(a, b));

        assert!(topo.reachable(c, c));
        assert!(topo.reachable(a, b) && topo.reachable(b, a));
        assert!(!topo.reachable(a, c) && !topo.reachable(c, a));
    }

    #[test]
    fn test_remove_segment_cleans_foreign_links() {
        let mut topo = Topology::new();
        let s1 = topo.add_segment();
        let s2 = topo.add_segment();
        let r1 = topo.segment_mut(s1).unwrap().add_router(2, "r1").unwrap();
        let r2 = topo.segment_mut(s2).unwrap().add_router(2, "r2").unwrap();
        let e2 = topo.segment_mut(s2).unwrap().add_endpoint();
        let b1 = topo.segment_mut(s1).unwrap().add_bridge(2, "b1").unwrap();
        assert!(topo.connect(r1, r2));
        assert!(topo.connect(b1, e2));

        assert!(topo.remove_segment(s2));
        assert!(!topo.remove_segment(s2));
        assert!(topo.segment(s2).is_none());
        assert_eq!(topo.node(r1).unwrap().degree(), 0);
        assert_eq!(topo.node(b1).unwrap().degree(), 0);
        assert!(!topo.connect(r1, r2));
        assert!(!topo.reachable(r1, r2));
        assert_eq!(topo.segment_ids(), vec![s1]);
        assert_invariants(&topo);

        // ids are not reused
        let s3 = topo.add_segment();
        assert_ne!(s3, s2);
    }

    #[test]
    fn test_sorted_nodes_lists_endpoints_canonically() {
        let mut topo = Topology::new();
        let s = topo.add_segment();
        let seg = topo.segment_mut(s).unwrap();
        let to_bridge = seg.add_endpoint();
        let pair_b = seg.add_endpoint();
        let isolated = seg.add_endpoint();
        let sw = seg.add_bridge(2, "sw").unwrap();
        let pair_a = seg.add_endpoint();
        let hub = seg.add_bridge(2, "hub").unwrap();
        assert!(topo.connect(to_bridge, sw));
        assert!(topo.connect(pair_a, pair_b));

        assert_eq!(
            topo.segment(s).unwrap().endpoints(),
            vec![to_bridge, pair_b, isolated, pair_a]
        );
        assert_eq!(
            topo.sorted_nodes(s, NodeKind::Endpoint),
            vec![isolated, pair_b, pair_a, to_bridge]
        );
        assert_eq!(topo.sorted_nodes(s, NodeKind::Bridge), vec![hub, sw]);
        assert!(topo.sorted_nodes(s, NodeKind::Router).is_empty());

        topo.remove_segment(s);
        assert!(topo.sorted_nodes(s, NodeKind::Endpoint).is_empty());
    }

    #[test]
    fn test_shared_topology_behind_rwlock() {
        use std::sync::{Arc, RwLock};

        let shared = Arc::new(RwLock::new(Topology::new()));
        let (a, b) = {
            let mut topo = shared.write().unwrap();
            let s = topo.add_segment();
            let seg = topo.segment_mut(s).unwrap();
            (seg.add_endpoint(), seg.add_endpoint())
        };
        let writer = {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || shared.write().unwrap().connect(a, b))
        };
        assert!(writer.join().unwrap());
        assert!(shared.read().unwrap().reachable(a, b));
    }
}
