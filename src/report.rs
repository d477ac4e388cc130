//! Topology summary reports.
//!
//! Generates both JSON and human-readable text output.

use std::collections::HashSet;

use color_eyre::eyre::{Context, Result};
use serde::Serialize;

use crate::topology::{NodeId, NodeKind, Segment, Topology};

/// Per-segment counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentSummary {
    /// Position of the segment in the topology order
    pub index: usize,
    pub endpoints: usize,
    pub bridges: usize,
    pub routers: usize,
    pub internal_edges: usize,
    /// Edges leaving this segment
    pub foreign_links: usize,
    /// Connected components over same-segment edges
    pub components: usize,
    pub has_loops: bool,
}

/// Whole-topology report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopologyReport {
    pub segments: Vec<SegmentSummary>,
    pub total_nodes: usize,
    pub total_edges: usize,
    pub cross_segment_links: usize,
    pub has_loops: bool,
}

impl SegmentSummary {
    fn from_segment(index: usize, segment: &Segment) -> Self {
        let foreign_links = segment
            .iter()
            .map(|(id, node)| node.neighbors().filter(|n| n.segment != id.segment).count())
            .sum();
        Self {
            index,
            endpoints: segment.count(NodeKind::Endpoint),
            bridges: segment.count(NodeKind::Bridge),
            routers: segment.count(NodeKind::Router),
            internal_edges: segment.internal_edge_count(),
            foreign_links,
            components: count_components(segment),
            has_loops: segment.has_loops(),
        }
    }
}

fn count_components(segment: &Segment) -> usize {
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut components = 0;
    for (start, _) in segment.iter() {
        if !seen.insert(start) {
            continue;
        }
        components += 1;
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            let Some(node) = segment.node(current) else { continue };
            for next in node.neighbors().filter(|n| n.segment == start.segment) {
                if seen.insert(next) {
                    stack.push(next);
                }
            }
        }
    }
    components
}

impl TopologyReport {
    pub fn from_topology(topology: &Topology) -> Self {
        let segments: Vec<SegmentSummary> = topology
            .segments()
            .enumerate()
            .map(|(i, s)| SegmentSummary::from_segment(i, s))
            .collect();
        let edges = topology.edges();
        let cross_segment_links = edges.iter().filter(|(a, b)| a.segment != b.segment).count();
        Self {
            total_nodes: topology.segments().map(Segment::len).sum(),
            total_edges: edges.len(),
            cross_segment_links,
            has_loops: segments.iter().any(|s| s.has_loops),
            segments,
        }
    }

    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report to JSON")
    }

    /// Render as human-readable text
    pub fn to_text(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        lines.push("=".repeat(60));
        lines.push("                    TOPOLOGY REPORT".to_string());
        lines.push("=".repeat(60));
        lines.push(format!("Segments: {}", self.segments.len()));
        lines.push(format!("Nodes: {}", self.total_nodes));
        lines.push(format!("Edges: {} ({} cross-segment)", self.total_edges, self.cross_segment_links));
        lines.push(format!("Loops: {}", if self.has_loops { "yes" } else { "no" }));
        lines.push(String::new());

        for s in &self.segments {
            lines.push(format!("Segment {}:", s.index));
            lines.push(format!(
                "  endpoints={} bridges={} routers={}",
                s.endpoints, s.bridges, s.routers
            ));
            lines.push(format!(
                "  internal edges={} foreign links={} components={}",
                s.internal_edges, s.foreign_links, s.components
            ));
            if s.has_loops {
                lines.push("  WARNING: segment contains loops".to_string());
            }
        }

        lines.join("\n") + "\n"
    }
}
