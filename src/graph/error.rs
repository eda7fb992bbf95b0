//! Errors raised while ingesting records into the graph

use super::node::CanonicalId;
use serde::Serialize;
use thiserror::Error;

/// Why a single record could not be ingested.
///
/// Every variant except `DuplicateCanonicalIdCollision` is local to one
/// record: the pipeline counts it, logs it, and moves on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    #[error("malformed record from '{source_name}': {reason}")]
    MalformedRecord { source_name: String, reason: String },

    #[error("unknown edge type '{edge_type}'")]
    UnknownEdgeType { edge_type: String },

    #[error("edge type '{edge_type}' requires unknown endpoint type '{endpoint_type}'")]
    UnknownEdgeEndpointType {
        edge_type: String,
        endpoint_type: String,
    },

    #[error("{record_type} record missing required field '{field}'")]
    MissingField { record_type: String, field: String },

    #[error("edge type '{edge_type}' forbids self-loops")]
    SelfLoopForbidden { edge_type: String },

    #[error("canonical id {0} minted twice")]
    DuplicateCanonicalIdCollision(CanonicalId),
}

impl IngestError {
    pub fn malformed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Structural invariant violations abort the run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DuplicateCanonicalIdCollision(_))
    }

    pub fn kind(&self) -> RejectionKind {
        match self {
            Self::MalformedRecord { .. } => RejectionKind::MalformedRecord,
            Self::UnknownEdgeType { .. } => RejectionKind::UnknownEdgeType,
            Self::UnknownEdgeEndpointType { .. } => RejectionKind::UnknownEdgeEndpointType,
            Self::MissingField { .. } => RejectionKind::MissingField,
            Self::SelfLoopForbidden { .. } => RejectionKind::SelfLoopForbidden,
            Self::DuplicateCanonicalIdCollision(_) => RejectionKind::DuplicateCanonicalIdCollision,
        }
    }
}

/// Error category used for per-source rejection counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    MalformedRecord,
    UnknownEdgeType,
    UnknownEdgeEndpointType,
    MissingField,
    SelfLoopForbidden,
    DuplicateCanonicalIdCollision,
}

impl RejectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedRecord => "malformed_record",
            Self::UnknownEdgeType => "unknown_edge_type",
            Self::UnknownEdgeEndpointType => "unknown_edge_endpoint_type",
            Self::MissingField => "missing_field",
            Self::SelfLoopForbidden => "self_loop_forbidden",
            Self::DuplicateCanonicalIdCollision => "duplicate_canonical_id_collision",
        }
    }
}

impl std::fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
