//! Canonical edge representation and duplicate-evidence merging

use super::node::{Attributes, CanonicalId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Dedup key for edges. Every modeled edge type is directed, so the key
/// is the ordered (source, target, type) triple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    pub source: CanonicalId,
    pub target: CanonicalId,
    pub edge_type: String,
}

impl EdgeKey {
    pub fn new(source: CanonicalId, target: CanonicalId, edge_type: impl Into<String>) -> Self {
        Self {
            source,
            target,
            edge_type: edge_type.into(),
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

impl std::fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source, self.edge_type, self.target)
    }
}

/// A reconciled, deduplicated directed edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEdge {
    pub source_entity_id: CanonicalId,
    pub target_entity_id: CanonicalId,
    /// Relationship tag from the edge vocabulary (e.g., "geneAssociatesWithDisease")
    pub edge_type: String,
    /// Sources that reported this edge
    pub contributing_sources: BTreeSet<String>,
    /// Highest confidence reported by any source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl CanonicalEdge {
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(
            self.source_entity_id.clone(),
            self.target_entity_id.clone(),
            self.edge_type.clone(),
        )
    }
}

/// Combine two confidence observations.
///
/// The higher value wins; on a tie (or when only one side has a value)
/// the first-seen value is kept.
pub fn merge_confidence(first_seen: Option<f64>, incoming: Option<f64>) -> Option<f64> {
    match (first_seen, incoming) {
        (Some(a), Some(b)) if b > a => Some(b),
        (Some(a), _) => Some(a),
        (None, b) => b,
    }
}
