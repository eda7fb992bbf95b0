//! Record types emitted by source adapters
//!
//! A `RawRecord` is one candidate node or candidate edge with source-local
//! identifiers. Records are immutable once emitted; reconciliation and
//! assembly only read them.

use crate::graph::{AttributeValue, Attributes};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether a record describes a node or an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Node,
    Edge,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node => f.write_str("node"),
            Self::Edge => f.write_str("edge"),
        }
    }
}

/// Endpoint references and evidence carried by edge records.
///
/// An endpoint id is local to the emitting source unless a namespace is
/// given, in which case it is matched as a cross-reference in that
/// namespace (e.g. `NCBIGene` / `348`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeFields {
    pub edge_type: String,
    pub source_local_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_namespace: Option<String>,
    pub target_local_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// A single item emitted by an adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Filled in by the adapter when omitted from serialized input
    #[serde(default)]
    pub source_name: String,
    pub record_kind: RecordKind,
    #[serde(default)]
    pub local_id: String,
    #[serde(default)]
    pub entity_type: String,
    /// Namespace → external id (e.g. `{"NCBIGene": "348"}`)
    #[serde(default)]
    pub cross_references: BTreeMap<String, String>,
    #[serde(default)]
    pub attributes: Attributes,
    /// Present on edge records only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<EdgeFields>,
}

impl RawRecord {
    /// A candidate node
    pub fn node(
        source_name: impl Into<String>,
        local_id: impl Into<String>,
        entity_type: impl Into<String>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            record_kind: RecordKind::Node,
            local_id: local_id.into(),
            entity_type: entity_type.into(),
            cross_references: BTreeMap::new(),
            attributes: Attributes::new(),
            edge: None,
        }
    }

    /// A candidate edge between two source-local ids
    pub fn edge(
        source_name: impl Into<String>,
        edge_type: impl Into<String>,
        source_local_id: impl Into<String>,
        target_local_id: impl Into<String>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            record_kind: RecordKind::Edge,
            local_id: String::new(),
            entity_type: String::new(),
            cross_references: BTreeMap::new(),
            attributes: Attributes::new(),
            edge: Some(EdgeFields {
                edge_type: edge_type.into(),
                source_local_id: source_local_id.into(),
                source_namespace: None,
                target_local_id: target_local_id.into(),
                target_namespace: None,
                confidence: None,
            }),
        }
    }

    pub fn with_xref(mut self, namespace: impl Into<String>, id: impl Into<String>) -> Self {
        self.cross_references.insert(namespace.into(), id.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Match the source endpoint in an explicit namespace
    pub fn with_source_namespace(mut self, namespace: impl Into<String>) -> Self {
        if let Some(edge) = self.edge.as_mut() {
            edge.source_namespace = Some(namespace.into());
        }
        self
    }

    /// Match the target endpoint in an explicit namespace
    pub fn with_target_namespace(mut self, namespace: impl Into<String>) -> Self {
        if let Some(edge) = self.edge.as_mut() {
            edge.target_namespace = Some(namespace.into());
        }
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        if let Some(edge) = self.edge.as_mut() {
            edge.confidence = Some(confidence);
        }
        self
    }

    pub fn is_node(&self) -> bool {
        self.record_kind == RecordKind::Node
    }

    /// Short human-readable label for log lines
    pub fn describe(&self) -> String {
        match (&self.record_kind, &self.edge) {
            (RecordKind::Edge, Some(edge)) => format!(
                "{} edge {} -[{}]-> {}",
                self.source_name, edge.source_local_id, edge.edge_type, edge.target_local_id
            ),
            _ => format!(
                "{} {} {} '{}'",
                self.source_name, self.record_kind, self.entity_type, self.local_id
            ),
        }
    }
}

/// Normalize free text the way every source is cleaned before use:
/// trim, and collapse internal runs of whitespace to one space.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
