//! Canonical text encoding of a topology.

use std::collections::{HashMap, HashSet};

use crate::error::{Result, TopologyError};
use crate::topology::{sort_canonical, NodeId, NodeKind, SegmentId, Topology};

/// Encode every live segment, in topology order.
pub fn serialize(topology: &Topology) -> String {
    encode(topology, &topology.segment_ids())
}

/// Encode the segments in the given order.
///
/// `order` must list every live segment exactly once: edges may point into
/// any segment, and a reference can only be written as an index into the
/// emitted sequence.
pub fn serialize_ordered(topology: &Topology, order: &[SegmentId]) -> Result<String> {
    let mut seen = HashSet::new();
    for &id in order {
        if topology.segment(id).is_none() {
            return Err(TopologyError::UnknownSegment(id));
        }
        if !seen.insert(id) {
            return Err(TopologyError::InvalidOrdering(format!("segment {} listed twice", id)));
        }
    }
    if seen.len() != topology.segment_count() {
        return Err(TopologyError::InvalidOrdering(format!(
            "{} of {} segments listed",
            seen.len(),
            topology.segment_count()
        )));
    }
    Ok(encode(topology, order))
}

struct Encoder<'t> {
    topology: &'t Topology,
    ranks: HashMap<SegmentId, usize>,
}

impl<'t> Encoder<'t> {
    fn rank(&self, segment: SegmentId) -> usize {
        self.ranks.get(&segment).copied().unwrap_or(usize::MAX)
    }

    fn sorted(&self, mut ids: Vec<NodeId>) -> Vec<NodeId> {
        sort_canonical(self.topology, &mut ids, &|s: SegmentId| self.rank(s));
        ids
    }

    fn segment(&self, id: SegmentId, out: &mut String) {
        let Some(segment) = self.topology.segment(id) else {
            return;
        };
        out.push_str("network[ endpoints=( ");
        for node in self.sorted(segment.endpoints()) {
            out.push_str(&self.endpoint(node));
            out.push(' ');
        }
        out.push_str(")\nbridges=( ");
        for node in self.sorted(segment.bridges()) {
            out.push_str(&self.named(node));
            out.push(' ');
        }
        out.push_str(")\nrouters=( ");
        for node in self.sorted(segment.routers()) {
            out.push_str(&self.named(node));
            out.push(' ');
        }
        out.push_str(") ]\n");
    }

    fn endpoint(&self, id: NodeId) -> String {
        let peer = self
            .topology
            .node(id)
            .and_then(|n| n.neighbors().next())
            .filter(|&p| self.topology.node(p).map(|n| n.kind()) == Some(NodeKind::Endpoint));
        match peer {
            None => "node{ type= endpoint e_count= 0 }".to_string(),
            Some(p) if p.segment == id.segment => "node{ type= endpoint e_count= 1 }".to_string(),
            Some(p) => format!("node{{ type= endpoint e_count= 1 segment= {} }}", self.rank(p.segment)),
        }
    }

    fn named(&self, id: NodeId) -> String {
        let Some(node) = self.topology.node(id) else {
            return String::new();
        };
        let mut refs = Vec::new();
        let mut foreign_endpoints = Vec::new();
        let mut local_endpoints = 0;
        for peer in self.sorted(node.neighbors().collect()) {
            let Some(peer_node) = self.topology.node(peer) else { continue };
            let prefix = if peer.segment == id.segment {
                String::new()
            } else {
                format!("{}:", self.rank(peer.segment))
            };
            match peer_node.identifier() {
                Some(peer_id) => refs.push(format!("{}{}{}", prefix, peer_node.kind().ref_prefix(), peer_id)),
                None if prefix.is_empty() => local_endpoints += 1,
                None => foreign_endpoints.push(format!("{}{}", prefix, NodeKind::Endpoint.ref_prefix())),
            }
        }
        refs.extend(foreign_endpoints);

        let mut record = format!(
            "node{{ type= {} id= {} capacity= {} connected=( ",
            node.kind().keyword(),
            node.identifier().unwrap_or_default(),
            node.capacity()
        );
        for r in refs {
            record.push_str(&r);
            record.push(' ');
        }
        record.push_str(&format!(") e_count= {} }}", local_endpoints));
        record
    }
}

fn encode(topology: &Topology, order: &[SegmentId]) -> String {
    let encoder = Encoder {
        topology,
        ranks: order.iter().enumerate().map(|(i, &s)| (s, i)).collect(),
    };
    let mut out = String::from("net_series{\n");
    for &id in order {
        encoder.segment(id, &mut out);
    }
    out.push_str("}ser_end\n");
    out
}
