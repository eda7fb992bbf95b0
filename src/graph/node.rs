//! Canonical entity (node) representation

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Namespace for minting canonical entity ids (UUID v5).
const CANONICAL_NS: Uuid = Uuid::from_bytes([
    0x3f, 0x5d, 0x8a, 0x6e, 0x41, 0x0c, 0x4b, 0x9a,
    0xa2, 0x7e, 0x15, 0xc3, 0x90, 0x4d, 0x6b, 0x21,
]);

/// Stable identifier of a canonical entity
///
/// Serializes as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalId(String);

impl CanonicalId {
    /// Derive an id deterministically from an entity type and one identifier.
    ///
    /// The same inputs always produce the same id, so repeated runs over
    /// the same sources reproduce the same graph keys. Each part is length
    /// prefixed, so no split of the same characters maps to the same name.
    pub fn derive(entity_type: &str, namespace: &str, value: &str) -> Self {
        let mut name = Vec::with_capacity(entity_type.len() + namespace.len() + value.len() + 24);
        for part in [entity_type, namespace, value] {
            name.extend_from_slice(&(part.len() as u64).to_be_bytes());
            name.extend_from_slice(part.as_bytes());
        }
        Self(Uuid::new_v5(&CANONICAL_NS, &name).to_string())
    }

    /// Create a CanonicalId from an existing string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CanonicalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Scalar attribute values carried by records and entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl AttributeValue {
    /// Borrow the value as a string slice, if it is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// An empty string counts as absent for required-field checks
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::String(s) if s.trim().is_empty())
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for AttributeValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Attribute collection
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Cross-references grouped by namespace
pub type CrossReferences = BTreeMap<String, BTreeSet<String>>;

/// A reconciled node: the single representation of one real-world entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    /// Stable identifier, minted once per run
    pub canonical_id: CanonicalId,
    /// Entity type (e.g., "Gene", "Disease")
    pub entity_type: String,
    /// Display name
    pub primary_name: String,
    /// Union of every identifier observed for this entity
    pub cross_references: CrossReferences,
    /// Sources that contributed evidence
    pub contributing_sources: BTreeSet<String>,
    /// Merged attributes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    /// True when only edges have referenced this entity
    #[serde(default)]
    pub is_stub: bool,
}

impl CanonicalEntity {
    /// Render cross-references as sorted `namespace:id` strings
    pub fn cross_reference_strings(&self) -> Vec<String> {
        self.cross_references
            .iter()
            .flat_map(|(ns, ids)| ids.iter().map(move |id| format!("{}:{}", ns, id)))
            .collect()
    }

    /// Whether the entity carries the given identifier
    pub fn has_cross_reference(&self, namespace: &str, id: &str) -> bool {
        self.cross_references
            .get(namespace)
            .map(|ids| ids.contains(id))
            .unwrap_or(false)
    }
}
