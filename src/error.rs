//! Error types shared by the topology model and the text codec.

use crate::topology::{NodeKind, SegmentId};

/// Result alias for topology and codec operations.
pub type Result<T> = std::result::Result<T, TopologyError>;

/// Errors raised by node creation, ordering checks and decoding.
///
/// Policy rejections from `connect`/`disconnect` are not errors; those
/// operations report them as `false`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("{kind} identifier '{id}' is already used in this segment")]
    DuplicateIdentifier { kind: NodeKind, id: String },

    #[error("invalid identifier '{0}': expected a non-empty run of ASCII letters and digits")]
    InvalidIdentifier(String),

    #[error("invalid capacity {0}: must be at least 1")]
    InvalidCapacity(usize),

    #[error("unknown segment {0}")]
    UnknownSegment(SegmentId),

    #[error("invalid segment ordering: {0}")]
    InvalidOrdering(String),

    #[error("malformed input at {position} near '{token}': {reason}")]
    MalformedInput {
        position: Position,
        token: String,
        reason: String,
    },
}

/// Line and column (both 1-based) of a token in codec input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl TopologyError {
    pub(crate) fn malformed(position: Position, token: &str, reason: impl Into<String>) -> Self {
        TopologyError::MalformedInput {
            position,
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}
