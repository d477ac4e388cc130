//! Scenario configuration.
//!
//! A scenario is a YAML description of segments, their nodes and the links
//! between nodes. Endpoint names exist only in the scenario file; the
//! topology itself never stores them.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::topology::validate_identifier;

/// Complete scenario file
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Scenario {
    #[serde(default)]
    pub general: GeneralConfig,
    pub segments: Vec<SegmentConfig>,
    #[serde(default)]
    pub links: Vec<(String, String)>,
}

/// Shared general settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeneralConfig {
    /// Break same-segment loops after all links are made
    #[serde(default)]
    pub fix_loops: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

/// One segment and the nodes it owns
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SegmentConfig {
    pub name: String,
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub bridges: Vec<NamedNodeConfig>,
    #[serde(default)]
    pub routers: Vec<NamedNodeConfig>,
}

/// Bridge or router declaration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NamedNodeConfig {
    pub id: String,
    pub capacity: usize,
}

/// Scenario validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid segment configuration: {0}")]
    InvalidSegment(String),
    #[error("Invalid link: {0}")]
    InvalidLink(String),
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            fix_loops: false,
            log_level: Some("info".to_string()),
        }
    }
}

impl Scenario {
    /// Validate names, capacities and link references.
    ///
    /// Policy violations (full ports, router segment conflicts) are only
    /// detected when the scenario is built.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(level) = &self.general.log_level {
            if level.parse::<log::LevelFilter>().is_err() {
                return Err(ValidationError::InvalidGeneral(format!("unknown log level '{}'", level)));
            }
        }

        let mut segment_names = HashSet::new();
        for segment in &self.segments {
            if segment.name.is_empty() || segment.name.contains('/') {
                return Err(ValidationError::InvalidSegment(format!(
                    "segment name '{}' must be non-empty and must not contain '/'",
                    segment.name
                )));
            }
            if !segment_names.insert(segment.name.as_str()) {
                return Err(ValidationError::InvalidSegment(format!(
                    "duplicate segment name '{}'",
                    segment.name
                )));
            }
            Self::validate_segment(segment)?;
        }

        for (from, to) in &self.links {
            let a = self.lookup(from)?;
            let b = self.lookup(to)?;
            if a == b {
                return Err(ValidationError::InvalidLink(format!("'{}' is linked to itself", from)));
            }
        }
        Ok(())
    }

    fn validate_segment(segment: &SegmentConfig) -> Result<(), ValidationError> {
        let mut names = HashSet::new();
        for name in &segment.endpoints {
            if name.is_empty() {
                return Err(ValidationError::InvalidSegment(format!(
                    "empty endpoint name in segment '{}'",
                    segment.name
                )));
            }
            if !names.insert(name.as_str()) {
                return Err(ValidationError::InvalidSegment(format!(
                    "duplicate node name '{}' in segment '{}'",
                    name, segment.name
                )));
            }
        }
        for node in segment.bridges.iter().chain(&segment.routers) {
            validate_identifier(&node.id)
                .map_err(|e| ValidationError::InvalidSegment(format!("segment '{}': {}", segment.name, e)))?;
            if node.capacity == 0 {
                return Err(ValidationError::InvalidSegment(format!(
                    "node '{}' in segment '{}' has zero capacity",
                    node.id, segment.name
                )));
            }
            // scenario names share one namespace so links stay unambiguous
            if !names.insert(node.id.as_str()) {
                return Err(ValidationError::InvalidSegment(format!(
                    "duplicate node name '{}' in segment '{}'",
                    node.id, segment.name
                )));
            }
        }
        Ok(())
    }

    /// Resolve a `segment/node` reference to (segment position, node name).
    pub fn lookup<'a>(&self, reference: &'a str) -> Result<(usize, &'a str), ValidationError> {
        let (segment, node) = reference
            .split_once('/')
            .ok_or_else(|| ValidationError::InvalidLink(format!("'{}' is not of the form segment/node", reference)))?;
        let position = self
            .segments
            .iter()
            .position(|s| s.name == segment)
            .ok_or_else(|| ValidationError::InvalidLink(format!("unknown segment '{}' in '{}'", segment, reference)))?;
        let config = &self.segments[position];
        let known = config.endpoints.iter().any(|e| e == node)
            || config.bridges.iter().chain(&config.routers).any(|n| n.id == node);
        if !known {
            return Err(ValidationError::InvalidLink(format!("unknown node '{}' in '{}'", node, reference)));
        }
        Ok((position, node))
    }
}
