//! Reconciler: decides which canonical entity a record refers to
//!
//! Identity is the connected component of shared identifiers within one
//! entity type. The reconciler keeps one live canonical id per component;
//! when a record bridges two components their entities merge, the
//! earliest-created id survives, and the absorbed id is forwarded to it.

use super::index::{Identifier, ReconciliationIndex};
use crate::adapter::{clean_text, RawRecord};
use crate::graph::{CanonicalId, IngestError};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Outcome of resolving one record or endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The live canonical id the record resolved to
    pub canonical_id: CanonicalId,
    /// True when the id was minted by this call
    pub created: bool,
    /// Ids merged into `canonical_id` by this call
    pub absorbed: Vec<CanonicalId>,
}

#[derive(Debug)]
struct Identity {
    /// Creation order; lower survives a merge
    seq: u64,
    entity_type: String,
    identifiers: BTreeSet<Identifier>,
}

/// Owns the reconciliation index for a single pipeline run
#[derive(Debug, Default)]
pub struct Reconciler {
    index: ReconciliationIndex,
    identities: HashMap<CanonicalId, Identity>,
    /// Absorbed id → the id it was merged into
    forwarded: HashMap<CanonicalId, CanonicalId>,
    next_seq: u64,
    merges: usize,
}

/// The usable identifiers of a node record: the implicit
/// `(source_name, local_id)` plus every non-blank cross-reference.
pub fn record_identifiers(record: &RawRecord) -> BTreeSet<Identifier> {
    let mut identifiers = BTreeSet::new();

    let source = clean_text(&record.source_name);
    let local = clean_text(&record.local_id);
    if !source.is_empty() && !local.is_empty() {
        identifiers.insert(Identifier::new(source, local));
    }

    for (namespace, value) in &record.cross_references {
        let namespace = clean_text(namespace);
        let value = clean_text(value);
        if !namespace.is_empty() && !value.is_empty() {
            identifiers.insert(Identifier::new(namespace, value));
        }
    }

    identifiers
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a node record to its canonical id.
    ///
    /// Every identifier of the record is registered under the returned id.
    /// A record with no usable identifiers is a `MalformedRecord`.
    pub fn resolve(&mut self, record: &RawRecord) -> Result<Resolution, IngestError> {
        let entity_type = clean_text(&record.entity_type);
        if entity_type.is_empty() {
            return Err(IngestError::malformed(
                &record.source_name,
                format!("record '{}' has no entity type", record.local_id),
            ));
        }

        let identifiers = record_identifiers(record);
        if identifiers.is_empty() {
            return Err(IngestError::malformed(
                &record.source_name,
                "empty local_id and no cross-references",
            ));
        }

        self.resolve_identifiers(&entity_type, identifiers)
    }

    /// Resolve a single edge endpoint, minting a new id if it was never seen
    pub fn resolve_endpoint(
        &mut self,
        entity_type: &str,
        identifier: Identifier,
    ) -> Result<Resolution, IngestError> {
        let mut identifiers = BTreeSet::new();
        identifiers.insert(identifier);
        self.resolve_identifiers(entity_type, identifiers)
    }

    /// Read-only lookup of one identifier
    pub fn lookup(&self, entity_type: &str, identifier: &Identifier) -> Option<&CanonicalId> {
        self.index.get(entity_type, identifier)
    }

    fn resolve_identifiers(
        &mut self,
        entity_type: &str,
        identifiers: BTreeSet<Identifier>,
    ) -> Result<Resolution, IngestError> {
        let mut hits: Vec<(u64, CanonicalId)> = identifiers
            .iter()
            .filter_map(|ident| self.index.get(entity_type, ident))
            .filter_map(|id| self.identities.get(id).map(|identity| (identity.seq, id.clone())))
            .collect();
        hits.sort();
        hits.dedup();

        let mut hits = hits.into_iter().map(|(_, id)| id);
        let Some(survivor) = hits.next() else {
            return self.mint(entity_type, identifiers);
        };

        let mut absorbed = Vec::new();
        for other in hits {
            self.absorb(&survivor, &other);
            absorbed.push(other);
        }

        for ident in identifiers {
            if self.index.get(entity_type, &ident) != Some(&survivor) {
                self.index.insert(entity_type, ident.clone(), survivor.clone());
            }
            if let Some(identity) = self.identities.get_mut(&survivor) {
                identity.identifiers.insert(ident);
            }
        }

        Ok(Resolution {
            canonical_id: survivor,
            created: false,
            absorbed,
        })
    }

    fn mint(
        &mut self,
        entity_type: &str,
        identifiers: BTreeSet<Identifier>,
    ) -> Result<Resolution, IngestError> {
        let Some(first) = identifiers.iter().next() else {
            return Err(IngestError::malformed("", "no identifiers to mint from"));
        };
        let id = CanonicalId::derive(entity_type, &first.namespace, &first.value);

        if self.identities.contains_key(&id) || self.forwarded.contains_key(&id) {
            return Err(IngestError::DuplicateCanonicalIdCollision(id));
        }

        for ident in &identifiers {
            self.index.insert(entity_type, ident.clone(), id.clone());
        }
        self.identities.insert(
            id.clone(),
            Identity {
                seq: self.next_seq,
                entity_type: entity_type.to_string(),
                identifiers,
            },
        );
        self.next_seq += 1;

        Ok(Resolution {
            canonical_id: id,
            created: true,
            absorbed: Vec::new(),
        })
    }

    /// Merge `other` into `survivor`, repointing every identifier of `other`
    fn absorb(&mut self, survivor: &CanonicalId, other: &CanonicalId) {
        let Some(absorbed) = self.identities.remove(other) else {
            return;
        };

        for ident in &absorbed.identifiers {
            self.index
                .insert(&absorbed.entity_type, ident.clone(), survivor.clone());
        }
        if let Some(identity) = self.identities.get_mut(survivor) {
            identity.identifiers.extend(absorbed.identifiers);
        }
        self.forwarded.insert(other.clone(), survivor.clone());
        self.merges += 1;

        debug!(
            survivor = %survivor,
            absorbed = %other,
            entity_type = %absorbed.entity_type,
            "merged entities sharing identifiers"
        );
    }

    /// Follow merge forwarding to the live id for any id ever returned
    pub fn canonical_of(&self, id: &CanonicalId) -> Option<CanonicalId> {
        let mut current = id;
        loop {
            if self.identities.contains_key(current) {
                return Some(current.clone());
            }
            current = self.forwarded.get(current)?;
        }
    }

    /// Every identifier registered for a live entity
    pub fn identifiers(&self, id: &CanonicalId) -> Option<&BTreeSet<Identifier>> {
        self.identities.get(id).map(|identity| &identity.identifiers)
    }

    /// Creation sequence of a live entity
    pub fn sequence(&self, id: &CanonicalId) -> Option<u64> {
        self.identities.get(id).map(|identity| identity.seq)
    }

    /// Number of live canonical entities
    pub fn entity_count(&self) -> usize {
        self.identities.len()
    }

    /// Number of merges performed so far
    pub fn merges(&self) -> usize {
        self.merges
    }

    pub fn index(&self) -> &ReconciliationIndex {
        &self.index
    }
}
