//! Seeded random topology generation.
//!
//! Topologies are built only through the public construction and connection
//! operations, so every generated graph satisfies the node policies. The same
//! parameters always produce the same topology.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::topology::{NodeId, Topology};

/// Parameters for [`generate`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorParams {
    pub seed: u64,
    /// Number of segments
    pub segments: usize,
    /// Nodes per segment
    pub nodes: usize,
    /// Connection attempts; rejected attempts are skipped
    pub links: usize,
    /// Largest capacity given to a bridge or router
    #[serde(default = "default_max_capacity")]
    pub max_capacity: usize,
}

fn default_max_capacity() -> usize {
    4
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self {
            seed: 0,
            segments: 3,
            nodes: 6,
            links: 12,
            max_capacity: default_max_capacity(),
        }
    }
}

/// Generate a random topology.
///
/// Each node is an endpoint, bridge or router with equal probability.
/// Bridge and router identifiers are `b<n>` / `r<n>` with `n` counting per
/// segment, so they never collide. Link attempts pick two nodes uniformly
/// from the whole topology; attempts rejected by node policy are dropped.
pub fn generate(params: &GeneratorParams) -> Topology {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut topology = Topology::new();
    let mut all: Vec<NodeId> = Vec::new();
    let max_capacity = params.max_capacity.max(1);

    for _ in 0..params.segments {
        let id = topology.add_segment();
        let Some(segment) = topology.segment_mut(id) else {
            continue;
        };
        for n in 0..params.nodes {
            let capacity = rng.gen_range(1..=max_capacity);
            let node = match rng.gen_range(0..3) {
                0 => Ok(segment.add_endpoint()),
                1 => segment.add_bridge(capacity, &format!("b{}", n)),
                _ => segment.add_router(capacity, &format!("r{}", n)),
            };
            // identifiers are unique and well formed, so this cannot fail
            if let Ok(node) = node {
                all.push(node);
            }
        }
    }

    let mut made = 0;
    if all.len() >= 2 {
        for _ in 0..params.links {
            let a = all[rng.gen_range(0..all.len())];
            let b = all[rng.gen_range(0..all.len())];
            if topology.connect(a, b) {
                made += 1;
            }
        }
    }

    debug!(
        "Generated {} segments, {} nodes, {} of {} link attempts accepted (seed {})",
        params.segments,
        all.len(),
        made,
        params.links,
        params.seed
    );
    topology
}
