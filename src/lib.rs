//! # NetSim - Segmented network topology modelling
//!
//! This library models networks made of endpoints, bridges and routers
//! grouped into segments, enforces per-kind connection policies, answers
//! reachability and loop queries, and reads and writes a canonical text
//! format.
//!
//! ## Key Features
//!
//! - **Connection Policies**: Endpoints take one link, bridges a bounded number
//!   of distinct peers, routers at most one link into any given segment
//! - **Graph Queries**: Reachability across segment boundaries, loop detection
//!   and repair within a segment
//! - **Canonical Text Format**: Byte-identical output for equivalent graphs,
//!   lossless round trips
//! - **Scenarios**: YAML descriptions of segments and links
//! - **Reproducible Generation**: Seeded random topologies
//!
//! ## Architecture
//!
//! - `topology`: Nodes, segments and the topology that owns them
//! - `codec`: Canonical text serializer and deserializer
//! - `config`: Scenario structures and validation
//! - `config_loader`: Scenario file loading and topology construction
//! - `generator`: Seeded random topologies
//! - `report`: JSON and text summaries
//! - `error`: Error type shared by the library
//!
//! ## Example Usage
//!
//! ```rust
//! use netsim::codec::{deserialize, serialize};
//! use netsim::topology::Topology;
//!
//! let mut topology = Topology::new();
//! let lan = topology.add_segment();
//! let segment = topology.segment_mut(lan).unwrap();
//! let switch = segment.add_bridge(4, "sw")?;
//! let pc = segment.add_endpoint();
//! assert!(topology.connect(switch, pc));
//!
//! let text = serialize(&topology);
//! assert_eq!(serialize(&deserialize(&text)?), text);
//! # Ok::<(), netsim::error::TopologyError>(())
//! ```
//!
//! ## Error Handling
//!
//! Library operations return [`error::TopologyError`]. Scenario loading and
//! the command line use `color_eyre` for error reports with context.

pub mod codec;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod generator;
pub mod report;
pub mod topology;

pub use error::{Result, TopologyError};
pub use topology::{NodeId, NodeKind, SegmentId, Topology};
