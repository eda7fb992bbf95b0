//! GraphAssembler: builds the canonical node and edge tables
//!
//! Owns the `Reconciler` for the run. Node records resolve to an entity and
//! upsert its attributes; edge records resolve both endpoints (creating
//! stubs for endpoints never seen as nodes) and merge into the edge table
//! by (source, target, type). `finalize` re-keys edges through merge
//! forwarding and produces sorted output.

use super::conflict::{AttributeSlot, AttributeTable, ConflictPolicy};
use super::edge::{merge_confidence, CanonicalEdge, EdgeKey};
use super::error::IngestError;
use super::node::{CanonicalEntity, CanonicalId, CrossReferences};
use crate::adapter::{clean_text, EdgeFields, RawRecord, RecordKind};
use crate::reconcile::{Identifier, Reconciler, Resolution};
use crate::schema::{EdgeTypeSpec, Schema};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// What an accepted record did to the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingested {
    Node {
        canonical_id: CanonicalId,
        created: bool,
        /// Entities absorbed into `canonical_id` by this record
        merged: usize,
    },
    Edge {
        key: EdgeKey,
        /// True when the triple had already been reported
        duplicate: bool,
        stubs_created: usize,
    },
}

/// Running totals, available before finalize
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub entities: usize,
    pub stub_entities: usize,
    pub edges: usize,
    pub merges: usize,
}

#[derive(Debug)]
struct EntityDraft {
    entity_type: String,
    contributing_sources: BTreeSet<String>,
    attributes: AttributeTable,
    /// Source-local ids of node records, for the display-name fallback
    local_ids: BTreeSet<String>,
    is_stub: bool,
}

impl EntityDraft {
    fn stub(entity_type: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            contributing_sources: BTreeSet::new(),
            attributes: AttributeTable::default(),
            local_ids: BTreeSet::new(),
            is_stub: true,
        }
    }

    fn absorb(&mut self, policy: &ConflictPolicy, other: EntityDraft) {
        self.contributing_sources.extend(other.contributing_sources);
        self.local_ids.extend(other.local_ids);
        self.attributes.absorb(policy, other.attributes);
        self.is_stub = self.is_stub && other.is_stub;
    }
}

#[derive(Debug, Default)]
struct EdgeDraft {
    contributing_sources: BTreeSet<String>,
    confidence: Option<f64>,
    attributes: AttributeTable,
}

impl EdgeDraft {
    fn absorb(&mut self, policy: &ConflictPolicy, other: EdgeDraft) {
        self.contributing_sources.extend(other.contributing_sources);
        self.confidence = merge_confidence(self.confidence, other.confidence);
        self.attributes.absorb(policy, other.attributes);
    }
}

/// Builds one graph from a stream of raw records
#[derive(Debug)]
pub struct GraphAssembler {
    schema: Schema,
    policy: ConflictPolicy,
    reconciler: Reconciler,
    entities: HashMap<CanonicalId, EntityDraft>,
    edges: HashMap<EdgeKey, EdgeDraft>,
    /// Write sequence for last-writer conflict resolution
    writes: u64,
}

impl GraphAssembler {
    pub fn new(schema: Schema, policy: ConflictPolicy) -> Self {
        Self {
            schema,
            policy,
            reconciler: Reconciler::new(),
            entities: HashMap::new(),
            edges: HashMap::new(),
            writes: 0,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Ingest one record.
    ///
    /// A rejected record leaves the graph unchanged. Only
    /// `DuplicateCanonicalIdCollision` is fatal to the run.
    pub fn ingest(&mut self, record: &RawRecord) -> Result<Ingested, IngestError> {
        self.writes += 1;
        match record.record_kind {
            RecordKind::Node => self.ingest_node(record),
            RecordKind::Edge => self.ingest_edge(record),
        }
    }

    fn ingest_node(&mut self, record: &RawRecord) -> Result<Ingested, IngestError> {
        if let Some(spec) = self.schema.entity_type(&record.entity_type) {
            for field in &spec.required_fields {
                let present = record
                    .attributes
                    .get(field)
                    .is_some_and(|value| !value.is_blank());
                if !present {
                    return Err(IngestError::MissingField {
                        record_type: spec.name.clone(),
                        field: field.clone(),
                    });
                }
            }
        }

        let resolution = self.reconciler.resolve(record)?;
        let merged = resolution.absorbed.len();
        let entity_type = clean_text(&record.entity_type);
        self.fold_resolution(&entity_type, &resolution);

        let source = clean_text(&record.source_name);
        let local_id = clean_text(&record.local_id);
        let written_at = self.writes;
        let policy = &self.policy;
        let draft = self
            .entities
            .entry(resolution.canonical_id.clone())
            .or_insert_with(|| EntityDraft::stub(&entity_type));

        draft.is_stub = false;
        draft.contributing_sources.insert(source.clone());
        if !local_id.is_empty() {
            draft.local_ids.insert(local_id);
        }
        for (field, value) in &record.attributes {
            if value.is_blank() {
                continue;
            }
            draft.attributes.upsert(
                policy,
                field,
                AttributeSlot {
                    value: value.clone(),
                    source: source.clone(),
                    written_at,
                },
            );
        }

        Ok(Ingested::Node {
            canonical_id: resolution.canonical_id,
            created: resolution.created,
            merged,
        })
    }

    fn ingest_edge(&mut self, record: &RawRecord) -> Result<Ingested, IngestError> {
        let Some(fields) = record.edge.as_ref() else {
            return Err(IngestError::malformed(
                &record.source_name,
                "edge record without endpoint fields",
            ));
        };
        let spec = self.validate_edge(record, fields)?.clone();

        let source = clean_text(&record.source_name);
        let source_ident = endpoint_identifier(
            &source,
            fields.source_namespace.as_deref(),
            &fields.source_local_id,
        )
        .ok_or_else(|| IngestError::malformed(&record.source_name, "edge source endpoint is empty"))?;
        let target_ident = endpoint_identifier(
            &source,
            fields.target_namespace.as_deref(),
            &fields.target_local_id,
        )
        .ok_or_else(|| IngestError::malformed(&record.source_name, "edge target endpoint is empty"))?;

        if !spec.allow_self_loops && self.is_self_loop(&spec, &source_ident, &target_ident) {
            return Err(IngestError::SelfLoopForbidden {
                edge_type: spec.name.clone(),
            });
        }

        let mut stubs_created = 0;
        let source_id = self.resolve_endpoint(&spec.source_type, source_ident, &mut stubs_created)?;
        let target_id = self.resolve_endpoint(&spec.target_type, target_ident, &mut stubs_created)?;

        let key = EdgeKey::new(source_id, target_id, spec.name.clone());
        let duplicate = self.edges.contains_key(&key);
        let written_at = self.writes;
        let policy = &self.policy;
        let draft = self.edges.entry(key.clone()).or_default();

        draft.contributing_sources.insert(source.clone());
        draft.confidence = merge_confidence(draft.confidence, fields.confidence);
        for (field, value) in &record.attributes {
            if value.is_blank() {
                continue;
            }
            draft.attributes.upsert(
                policy,
                field,
                AttributeSlot {
                    value: value.clone(),
                    source: source.clone(),
                    written_at,
                },
            );
        }

        if duplicate {
            debug!(edge = %key, source = %source, "merged duplicate edge evidence");
        }

        Ok(Ingested::Edge {
            key,
            duplicate,
            stubs_created,
        })
    }

    /// Type checks that must pass before any index mutation
    fn validate_edge(&self, record: &RawRecord, fields: &EdgeFields) -> Result<&EdgeTypeSpec, IngestError> {
        let edge_type = clean_text(&fields.edge_type);
        let spec = self
            .schema
            .edge_type(&edge_type)
            .ok_or(IngestError::UnknownEdgeType { edge_type })?;

        for endpoint_type in [&spec.source_type, &spec.target_type] {
            if !self.schema.is_known_entity_type(endpoint_type) {
                return Err(IngestError::UnknownEdgeEndpointType {
                    edge_type: spec.name.clone(),
                    endpoint_type: endpoint_type.clone(),
                });
            }
        }

        for field in &spec.required_fields {
            let present = record
                .attributes
                .get(field)
                .is_some_and(|value| !value.is_blank());
            if !present {
                return Err(IngestError::MissingField {
                    record_type: spec.name.clone(),
                    field: field.clone(),
                });
            }
        }

        if let Some(confidence) = fields.confidence {
            if !confidence.is_finite() {
                return Err(IngestError::malformed(
                    &record.source_name,
                    format!("non-finite confidence {}", confidence),
                ));
            }
        }

        Ok(spec)
    }

    /// Whether both endpoints name the same entity, without minting anything
    fn is_self_loop(&self, spec: &EdgeTypeSpec, source: &Identifier, target: &Identifier) -> bool {
        if spec.source_type != spec.target_type {
            return false;
        }
        if source == target {
            return true;
        }
        match (
            self.reconciler.lookup(&spec.source_type, source),
            self.reconciler.lookup(&spec.target_type, target),
        ) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn resolve_endpoint(
        &mut self,
        entity_type: &str,
        identifier: Identifier,
        stubs_created: &mut usize,
    ) -> Result<CanonicalId, IngestError> {
        let resolution = self.reconciler.resolve_endpoint(entity_type, identifier)?;
        self.fold_resolution(entity_type, &resolution);

        self.entities
            .entry(resolution.canonical_id.clone())
            .or_insert_with(|| EntityDraft::stub(entity_type));
        if resolution.created {
            *stubs_created += 1;
            debug!(entity_type, id = %resolution.canonical_id, "created stub entity");
        }

        Ok(resolution.canonical_id)
    }

    /// Move the drafts of absorbed entities into the survivor
    fn fold_resolution(&mut self, entity_type: &str, resolution: &Resolution) {
        if resolution.absorbed.is_empty() {
            return;
        }
        let mut absorbed_drafts = Vec::with_capacity(resolution.absorbed.len());
        for id in &resolution.absorbed {
            if let Some(draft) = self.entities.remove(id) {
                absorbed_drafts.push(draft);
            }
        }
        let survivor = self
            .entities
            .entry(resolution.canonical_id.clone())
            .or_insert_with(|| EntityDraft::stub(entity_type));
        for draft in absorbed_drafts {
            survivor.absorb(&self.policy, draft);
        }
    }

    pub fn stats(&self) -> AssemblyStats {
        AssemblyStats {
            entities: self.entities.len(),
            stub_entities: self.entities.values().filter(|d| d.is_stub).count(),
            edges: self.edges.len(),
            merges: self.reconciler.merges(),
        }
    }

    /// Produce the final tables, consuming the assembler.
    ///
    /// Entities are sorted by (type, id), edges by (source, target, type).
    /// Edge sources are credited to both endpoints of every surviving edge.
    pub fn finalize(self) -> (Vec<CanonicalEntity>, Vec<CanonicalEdge>) {
        let GraphAssembler {
            schema,
            policy,
            reconciler,
            mut entities,
            edges,
            ..
        } = self;

        let mut rekeyed: HashMap<EdgeKey, EdgeDraft> = HashMap::with_capacity(edges.len());
        let mut dropped_self_loops = 0usize;
        // Deterministic fold order for edges that collapse together
        let mut edges: Vec<(EdgeKey, EdgeDraft)> = edges.into_iter().collect();
        edges.sort_by(|a, b| a.0.cmp(&b.0));

        for (key, draft) in edges {
            let source = reconciler.canonical_of(&key.source).unwrap_or(key.source);
            let target = reconciler.canonical_of(&key.target).unwrap_or(key.target);
            let key = EdgeKey::new(source, target, key.edge_type);

            let forbids_loops = schema
                .edge_type(&key.edge_type)
                .is_some_and(|spec| !spec.allow_self_loops);
            if forbids_loops && key.is_self_loop() {
                dropped_self_loops += 1;
                continue;
            }

            match rekeyed.get_mut(&key) {
                Some(existing) => existing.absorb(&policy, draft),
                None => {
                    rekeyed.insert(key, draft);
                }
            }
        }
        if dropped_self_loops > 0 {
            warn!(
                count = dropped_self_loops,
                "dropped edges that became forbidden self-loops after merging"
            );
        }

        for (key, draft) in &rekeyed {
            for endpoint in [&key.source, &key.target] {
                if let Some(entity) = entities.get_mut(endpoint) {
                    entity
                        .contributing_sources
                        .extend(draft.contributing_sources.iter().cloned());
                }
            }
        }

        let mut entity_rows: Vec<CanonicalEntity> = entities
            .into_iter()
            .map(|(id, draft)| {
                let mut cross_references = CrossReferences::new();
                if let Some(identifiers) = reconciler.identifiers(&id) {
                    for ident in identifiers {
                        cross_references
                            .entry(ident.namespace.clone())
                            .or_default()
                            .insert(ident.value.clone());
                    }
                }
                let primary_name = primary_name(&schema, &draft, &cross_references);
                CanonicalEntity {
                    canonical_id: id,
                    entity_type: draft.entity_type,
                    primary_name,
                    cross_references,
                    contributing_sources: draft.contributing_sources,
                    attributes: draft.attributes.to_attributes(),
                    is_stub: draft.is_stub,
                }
            })
            .collect();
        entity_rows.sort_by(|a, b| {
            (a.entity_type.as_str(), &a.canonical_id).cmp(&(b.entity_type.as_str(), &b.canonical_id))
        });

        let mut edge_rows: Vec<CanonicalEdge> = rekeyed
            .into_iter()
            .map(|(key, draft)| CanonicalEdge {
                source_entity_id: key.source,
                target_entity_id: key.target,
                edge_type: key.edge_type,
                contributing_sources: draft.contributing_sources,
                confidence: draft.confidence,
                attributes: draft.attributes.to_attributes(),
            })
            .collect();
        edge_rows.sort_by_key(|edge| edge.key());

        (entity_rows, edge_rows)
    }
}

/// Identifier for an edge endpoint: explicit namespace, else the emitting source
fn endpoint_identifier(source: &str, namespace: Option<&str>, id: &str) -> Option<Identifier> {
    let namespace = namespace.map(clean_text).filter(|ns| !ns.is_empty());
    let namespace = namespace.unwrap_or_else(|| source.to_string());
    let id = clean_text(id);
    if namespace.is_empty() || id.is_empty() {
        return None;
    }
    Some(Identifier::new(namespace, id))
}

/// Display name: the type's name attribute, else the smallest source-local
/// id, else the smallest identifier value
fn primary_name(schema: &Schema, draft: &EntityDraft, xrefs: &CrossReferences) -> String {
    if let Some(value) = draft.attributes.get(schema.name_field(&draft.entity_type)) {
        if !value.is_blank() {
            return clean_text(&value.to_string());
        }
    }
    if let Some(local_id) = draft.local_ids.iter().next() {
        return local_id.clone();
    }
    xrefs
        .values()
        .flat_map(|values| values.iter())
        .min()
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AttributeValue;
    use crate::schema::EntityTypeSpec;

    fn assembler() -> GraphAssembler {
        GraphAssembler::new(Schema::biomedical(), ConflictPolicy::default())
    }

    fn entity_of<'a>(entities: &'a [CanonicalEntity], ns: &str, id: &str) -> &'a CanonicalEntity {
        entities
            .iter()
            .find(|e| e.has_cross_reference(ns, id))
            .unwrap()
    }

    // === Scenario: the same gene reported by two sources ===

    #[test]
    fn cross_source_gene_merges_into_one_entity() {
        let mut graph = assembler();
        graph
            .ingest(&RawRecord::node("A", "G1", "Gene").with_xref("NCBIGene", "348"))
            .unwrap();
        graph
            .ingest(&RawRecord::node("B", "APOE", "Gene").with_xref("NCBIGene", "348"))
            .unwrap();

        let (entities, edges) = graph.finalize();
        assert_eq!(entities.len(), 1);
        assert!(edges.is_empty());

        let gene = &entities[0];
        assert_eq!(gene.contributing_sources, BTreeSet::from(["A".to_string(), "B".to_string()]));
        assert_eq!(
            gene.cross_reference_strings(),
            vec!["A:G1", "B:APOE", "NCBIGene:348"]
        );
        assert!(!gene.is_stub);
    }

    // === Scenario: the same edge reported by two sources ===

    #[test]
    fn cross_source_edge_merges_evidence() {
        let mut graph = assembler();
        graph
            .ingest(
                &RawRecord::edge("A", "geneAssociatesWithDisease", "348", "C0002395")
                    .with_source_namespace("NCBIGene")
                    .with_target_namespace("UMLS")
                    .with_confidence(0.7),
            )
            .unwrap();
        let second = graph
            .ingest(
                &RawRecord::edge("B", "geneAssociatesWithDisease", "348", "C0002395")
                    .with_source_namespace("NCBIGene")
                    .with_target_namespace("UMLS")
                    .with_confidence(0.9),
            )
            .unwrap();
        assert!(matches!(second, Ingested::Edge { duplicate: true, stubs_created: 0, .. }));

        let (entities, edges) = graph.finalize();
        assert_eq!(entities.len(), 2);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].contributing_sources, BTreeSet::from(["A".to_string(), "B".to_string()]));
        assert_eq!(edges[0].confidence, Some(0.9));
    }

    #[test]
    fn equal_confidence_keeps_first_seen() {
        let mut graph = assembler();
        for source in ["A", "B"] {
            graph
                .ingest(
                    &RawRecord::edge(source, "drugTreatsDisease", "DB00843", "D1")
                        .with_source_namespace("DrugBank")
                        .with_target_namespace("MeSH")
                        .with_confidence(0.5),
                )
                .unwrap();
        }
        let (_, edges) = graph.finalize();
        assert_eq!(edges[0].confidence, Some(0.5));
    }

    // === Scenario: an edge arrives before its endpoints ===

    #[test]
    fn unseen_endpoints_become_typed_stubs() {
        let mut graph = assembler();
        let ingested = graph
            .ingest(&RawRecord::edge("ctd", "chemicalBindsGene", "D1", "G9"))
            .unwrap();
        assert!(matches!(ingested, Ingested::Edge { stubs_created: 2, .. }));
        assert_eq!(graph.stats().stub_entities, 2);

        let (entities, edges) = graph.finalize();
        assert_eq!(edges.len(), 1);
        let drug = entity_of(&entities, "ctd", "D1");
        let gene = entity_of(&entities, "ctd", "G9");
        assert_eq!(drug.entity_type, "Drug");
        assert_eq!(gene.entity_type, "Gene");
        assert!(drug.is_stub && gene.is_stub);
        assert!(drug.attributes.is_empty());
        assert_eq!(edges[0].source_entity_id, drug.canonical_id);
        assert_eq!(edges[0].target_entity_id, gene.canonical_id);
    }

    #[test]
    fn later_node_record_fills_stub() {
        let mut graph = assembler();
        graph
            .ingest(
                &RawRecord::edge("disgenet", "geneAssociatesWithDisease", "348", "D1")
                    .with_source_namespace("NCBIGene")
                    .with_target_namespace("MeSH"),
            )
            .unwrap();
        let node = graph
            .ingest(
                &RawRecord::node("ncbigene", "348", "Gene")
                    .with_xref("NCBIGene", "348")
                    .with_attribute("geneSymbol", "APOE"),
            )
            .unwrap();
        assert!(matches!(node, Ingested::Node { created: false, .. }));

        let (entities, _) = graph.finalize();
        let gene = entity_of(&entities, "NCBIGene", "348");
        assert!(!gene.is_stub);
        assert_eq!(gene.primary_name, "APOE");
        assert!(gene.contributing_sources.contains("disgenet"));
        assert!(gene.contributing_sources.contains("ncbigene"));
    }

    // === Scenario: a record bridges two existing entities ===

    #[test]
    fn transitive_merge_rewrites_edges() {
        let mut graph = assembler();
        graph
            .ingest(&RawRecord::node("A", "a", "Gene").with_xref("X", "1"))
            .unwrap();
        graph
            .ingest(&RawRecord::node("C", "c", "Gene").with_xref("Y", "2"))
            .unwrap();
        // Edges recorded against both entities before they merge
        graph
            .ingest(
                &RawRecord::edge("E", "geneInPathway", "1", "P1")
                    .with_source_namespace("X")
                    .with_target_namespace("Reactome"),
            )
            .unwrap();
        graph
            .ingest(
                &RawRecord::edge("F", "geneInPathway", "2", "P1")
                    .with_source_namespace("Y")
                    .with_target_namespace("Reactome")
                    .with_confidence(0.3),
            )
            .unwrap();

        let bridge = graph
            .ingest(
                &RawRecord::node("B", "b", "Gene")
                    .with_xref("X", "1")
                    .with_xref("Y", "2"),
            )
            .unwrap();
        assert!(matches!(bridge, Ingested::Node { merged: 1, .. }));

        let (entities, edges) = graph.finalize();
        let genes: Vec<_> = entities.iter().filter(|e| e.entity_type == "Gene").collect();
        assert_eq!(genes.len(), 1);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source_entity_id, genes[0].canonical_id);
        assert_eq!(
            edges[0].contributing_sources,
            BTreeSet::from(["E".to_string(), "F".to_string()])
        );
        assert_eq!(edges[0].confidence, Some(0.3));
        assert_eq!(genes[0].contributing_sources.len(), 5);
    }

    // === Scenario: validation failures leave the graph unchanged ===

    #[test]
    fn unknown_edge_type_is_rejected() {
        let mut graph = assembler();
        let err = graph
            .ingest(&RawRecord::edge("A", "geneRegulatesMood", "G1", "G2"))
            .unwrap_err();
        assert_eq!(
            err,
            IngestError::UnknownEdgeType {
                edge_type: "geneRegulatesMood".into()
            }
        );
        assert_eq!(graph.stats(), AssemblyStats::default());
    }

    #[test]
    fn edge_type_with_undeclared_endpoint_is_rejected() {
        let schema = Schema::new()
            .with_entity_type(EntityTypeSpec::new("Gene"))
            .with_edge_type(EdgeTypeSpec::new("geneInPathway", "Gene", "Pathway"));
        let mut graph = GraphAssembler::new(schema, ConflictPolicy::default());
        let err = graph
            .ingest(&RawRecord::edge("A", "geneInPathway", "G1", "P1"))
            .unwrap_err();
        assert!(matches!(err, IngestError::UnknownEdgeEndpointType { ref endpoint_type, .. } if endpoint_type == "Pathway"));
        assert_eq!(graph.stats().entities, 0);
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let schema = Schema::biomedical()
            .with_entity_type(EntityTypeSpec::new("Gene").with_required_field("geneSymbol"));
        let mut graph = GraphAssembler::new(schema, ConflictPolicy::default());

        let err = graph
            .ingest(&RawRecord::node("A", "G1", "Gene").with_attribute("geneSymbol", "  "))
            .unwrap_err();
        assert_eq!(
            err,
            IngestError::MissingField {
                record_type: "Gene".into(),
                field: "geneSymbol".into()
            }
        );
        assert_eq!(graph.stats().entities, 0);
        assert_eq!(graph.reconciler().index().len(), 0);
    }

    #[test]
    fn malformed_node_produces_no_entity() {
        let mut graph = assembler();
        let err = graph.ingest(&RawRecord::node("A", "", "Gene")).unwrap_err();
        assert!(matches!(err, IngestError::MalformedRecord { .. }));

        let err = graph
            .ingest(&RawRecord::edge("A", "geneInPathway", " ", "P1"))
            .unwrap_err();
        assert!(matches!(err, IngestError::MalformedRecord { .. }));

        let (entities, edges) = graph.finalize();
        assert!(entities.is_empty());
        assert!(edges.is_empty());
    }

    #[test]
    fn edge_record_without_fields_is_malformed() {
        let mut graph = assembler();
        let mut record = RawRecord::node("A", "x", "Gene");
        record.record_kind = RecordKind::Edge;
        assert!(matches!(
            graph.ingest(&record),
            Err(IngestError::MalformedRecord { .. })
        ));
    }

    // === Scenario: self-loops ===

    #[test]
    fn self_loops_are_kept_when_allowed() {
        let mut graph = assembler();
        graph
            .ingest(&RawRecord::edge("string", "geneInteractsWithGene", "G1", "G1"))
            .unwrap();
        let (entities, edges) = graph.finalize();
        assert_eq!(entities.len(), 1);
        assert_eq!(edges.len(), 1);
        assert!(edges[0].key().is_self_loop());
    }

    #[test]
    fn forbidden_self_loop_is_rejected_without_side_effects() {
        let schema = Schema::biomedical().with_edge_type(
            EdgeTypeSpec::new("geneInteractsWithGene", "Gene", "Gene").forbid_self_loops(),
        );
        let mut graph = GraphAssembler::new(schema, ConflictPolicy::default());

        let err = graph
            .ingest(&RawRecord::edge("string", "geneInteractsWithGene", "G1", "G1"))
            .unwrap_err();
        assert!(matches!(err, IngestError::SelfLoopForbidden { .. }));
        assert_eq!(graph.stats().entities, 0);

        // Different local ids that already resolve to one entity
        graph
            .ingest(
                &RawRecord::node("string", "G2", "Gene").with_xref("NCBIGene", "348"),
            )
            .unwrap();
        let err = graph
            .ingest(
                &RawRecord::edge("string", "geneInteractsWithGene", "G2", "348")
                    .with_target_namespace("NCBIGene"),
            )
            .unwrap_err();
        assert!(matches!(err, IngestError::SelfLoopForbidden { .. }));
    }

    #[test]
    fn merge_into_forbidden_self_loop_drops_edge_at_finalize() {
        let schema = Schema::biomedical().with_edge_type(
            EdgeTypeSpec::new("geneInteractsWithGene", "Gene", "Gene").forbid_self_loops(),
        );
        let mut graph = GraphAssembler::new(schema, ConflictPolicy::default());
        graph
            .ingest(
                &RawRecord::edge("string", "geneInteractsWithGene", "1", "2")
                    .with_source_namespace("NCBIGene")
                    .with_target_namespace("HGNC"),
            )
            .unwrap();
        assert_eq!(graph.stats().entities, 2);
        graph
            .ingest(
                &RawRecord::node("hgnc", "x", "Gene")
                    .with_xref("NCBIGene", "1")
                    .with_xref("HGNC", "2"),
            )
            .unwrap();
        assert_eq!(graph.stats().merges, 1);

        let (entities, edges) = graph.finalize();
        assert_eq!(entities.len(), 1);
        assert!(edges.is_empty());
        // The dropped edge leaves no evidence on the merged entity
        assert_eq!(
            entities[0].contributing_sources.iter().collect::<Vec<_>>(),
            vec!["hgnc"]
        );
    }

    #[test]
    fn forbidden_self_loop_outcome_does_not_depend_on_order() {
        let schema = Schema::biomedical().with_edge_type(
            EdgeTypeSpec::new("geneInteractsWithGene", "Gene", "Gene").forbid_self_loops(),
        );
        let edge = RawRecord::edge("string", "geneInteractsWithGene", "1", "2")
            .with_source_namespace("NCBIGene")
            .with_target_namespace("HGNC");
        let node = RawRecord::node("hgnc", "x", "Gene")
            .with_xref("NCBIGene", "1")
            .with_xref("HGNC", "2");

        let run = |records: [&RawRecord; 2]| {
            let mut graph = GraphAssembler::new(schema.clone(), ConflictPolicy::default());
            for record in records {
                let _ = graph.ingest(record);
            }
            let (entities, edges) = graph.finalize();
            let shapes: Vec<_> = entities
                .into_iter()
                .map(|e| {
                    let xrefs = e.cross_reference_strings();
                    (e.entity_type, xrefs, e.contributing_sources, e.is_stub)
                })
                .collect();
            (shapes, edges.len())
        };

        let edge_first = run([&edge, &node]);
        let node_first = run([&node, &edge]);
        assert_eq!(edge_first, node_first);
        assert_eq!(edge_first.1, 0);
    }

    // === Scenario: attributes and names ===

    #[test]
    fn primary_name_uses_type_name_field() {
        let mut graph = assembler();
        graph
            .ingest(
                &RawRecord::node("disease-ontology", "DOID:10652", "Disease")
                    .with_attribute("commonName", "Alzheimer's   disease"),
            )
            .unwrap();
        graph
            .ingest(&RawRecord::node("hgnc", "Z", "Gene"))
            .unwrap();
        graph
            .ingest(&RawRecord::node("hgnc", "A", "Gene").with_xref("hgnc", "Z"))
            .unwrap();

        let (entities, _) = graph.finalize();
        assert_eq!(entities[0].entity_type, "Disease");
        assert_eq!(entities[0].primary_name, "Alzheimer's disease");
        assert_eq!(entities[1].primary_name, "A");
    }

    #[test]
    fn stub_name_falls_back_to_identifier() {
        let mut graph = assembler();
        graph
            .ingest(
                &RawRecord::edge("ctd", "chemicalIncreasesExpression", "D003042", "7157")
                    .with_target_namespace("NCBIGene"),
            )
            .unwrap();
        let (entities, _) = graph.finalize();
        let gene = entity_of(&entities, "NCBIGene", "7157");
        assert_eq!(gene.primary_name, "7157");
    }

    #[test]
    fn attribute_conflicts_follow_policy() {
        let mut last_writer = assembler();
        let mut by_priority = GraphAssembler::new(
            Schema::biomedical(),
            ConflictPolicy::source_priority(["drugbank"]),
        );
        for graph in [&mut last_writer, &mut by_priority] {
            graph
                .ingest(
                    &RawRecord::node("drugbank", "DB00843", "Drug")
                        .with_attribute("commonName", "Donepezil"),
                )
                .unwrap();
            graph
                .ingest(
                    &RawRecord::node("ctd", "D1", "Drug")
                        .with_xref("drugbank", "DB00843")
                        .with_attribute("commonName", "donepezil hydrochloride")
                        .with_attribute("casNumber", "120014-06-4"),
                )
                .unwrap();
        }

        let (entities, _) = last_writer.finalize();
        assert_eq!(entities[0].primary_name, "donepezil hydrochloride");

        let (entities, _) = by_priority.finalize();
        assert_eq!(entities[0].primary_name, "Donepezil");
        assert_eq!(
            entities[0].attributes.get("casNumber"),
            Some(&AttributeValue::from("120014-06-4"))
        );
    }

    #[test]
    fn output_is_sorted() {
        let mut graph = assembler();
        for (local, ty) in [("p", "Pathway"), ("g2", "Gene"), ("d", "Disease"), ("g1", "Gene")] {
            graph.ingest(&RawRecord::node("S", local, ty)).unwrap();
        }
        graph.ingest(&RawRecord::edge("S", "geneInPathway", "g2", "p")).unwrap();
        graph.ingest(&RawRecord::edge("S", "geneInPathway", "g1", "p")).unwrap();
        graph
            .ingest(&RawRecord::edge("S", "geneAssociatesWithDisease", "g1", "d"))
            .unwrap();

        let (entities, edges) = graph.finalize();
        let types: Vec<_> = entities.iter().map(|e| e.entity_type.as_str()).collect();
        assert_eq!(types, vec!["Disease", "Gene", "Gene", "Pathway"]);
        let keys: Vec<_> = edges.iter().map(CanonicalEdge::key).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
}
