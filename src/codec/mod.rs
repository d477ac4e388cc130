//! Canonical text format for collections of segments.
//!
//! The encoding is a function of graph state and segment order only, and
//! decoding followed by encoding reproduces the input byte for byte.

pub mod decoder;
pub mod encoder;
pub mod lexer;

pub use decoder::deserialize;
pub use encoder::{serialize, serialize_ordered};
