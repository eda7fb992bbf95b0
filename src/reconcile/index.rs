//! ReconciliationIndex: (entity type, namespace, external id) → canonical id

use crate::graph::CanonicalId;
use std::collections::HashMap;

/// An external identifier in one namespace
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier {
    pub namespace: String,
    pub value: String,
}

impl Identifier {
    pub fn new(namespace: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.value)
    }
}

/// Lookup key. Identifiers only collide within one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct IndexKey {
    entity_type: String,
    identifier: Identifier,
}

/// Run-scoped identifier index.
///
/// Every registered identifier points at a live (non-absorbed) canonical
/// id: merges repoint the absorbed entity's identifiers before returning.
#[derive(Debug, Default)]
pub struct ReconciliationIndex {
    entries: HashMap<IndexKey, CanonicalId>,
}

impl ReconciliationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity_type: &str, identifier: &Identifier) -> Option<&CanonicalId> {
        // Borrowed lookup would need a custom Borrow impl; keys are small.
        self.entries.get(&IndexKey {
            entity_type: entity_type.to_string(),
            identifier: identifier.clone(),
        })
    }

    /// Point an identifier at a canonical id, returning the previous target
    pub fn insert(
        &mut self,
        entity_type: &str,
        identifier: Identifier,
        id: CanonicalId,
    ) -> Option<CanonicalId> {
        self.entries.insert(
            IndexKey {
                entity_type: entity_type.to_string(),
                identifier,
            },
            id,
        )
    }

    /// Number of registered identifiers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_scoped_by_entity_type() {
        let mut index = ReconciliationIndex::new();
        let id = Identifier::new("MeSH", "D000544");
        index.insert("Disease", id.clone(), CanonicalId::from("disease-1"));

        assert_eq!(index.get("Disease", &id), Some(&CanonicalId::from("disease-1")));
        assert_eq!(index.get("Drug", &id), None);
    }

    #[test]
    fn insert_repoints_existing_identifier() {
        let mut index = ReconciliationIndex::new();
        let id = Identifier::new("NCBIGene", "348");
        assert!(index.insert("Gene", id.clone(), CanonicalId::from("a")).is_none());
        let previous = index.insert("Gene", id.clone(), CanonicalId::from("b"));

        assert_eq!(previous, Some(CanonicalId::from("a")));
        assert_eq!(index.get("Gene", &id), Some(&CanonicalId::from("b")));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn identifier_display_joins_namespace_and_value() {
        assert_eq!(Identifier::new("HGNC", "613").to_string(), "HGNC:613");
    }
}
