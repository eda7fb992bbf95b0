//! Shared fixtures for biokg integration tests
//!
//! Builders for a small Alzheimer's-flavoured record set, seeded shuffling,
//! and an id-free view of a graph so runs over different record orders
//! can be compared.

#![allow(dead_code)]

use biokg::{
    CanonicalEdge, CanonicalEntity, ConflictPolicy, GraphAssembler, IngestError, RawRecord, Schema,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, BTreeSet};

pub fn gene(source: &str, local_id: &str, ncbi: &str, symbol: &str) -> RawRecord {
    RawRecord::node(source, local_id, "Gene")
        .with_xref("NCBIGene", ncbi)
        .with_attribute("geneSymbol", symbol)
}

pub fn disease(source: &str, local_id: &str, doid: &str, name: &str) -> RawRecord {
    RawRecord::node(source, local_id, "Disease")
        .with_xref("DOID", doid)
        .with_attribute("commonName", name)
}

/// Gene → Disease association keyed by NCBI gene and DOID ids
pub fn association(source: &str, ncbi: &str, doid: &str, confidence: Option<f64>) -> RawRecord {
    let record = RawRecord::edge(source, "geneAssociatesWithDisease", ncbi, doid)
        .with_source_namespace("NCBIGene")
        .with_target_namespace("DOID");
    match confidence {
        Some(c) => record.with_confidence(c),
        None => record,
    }
}

/// A record set with cross-source overlap, a transitive chain, stub
/// endpoints, duplicate edge evidence, and a couple of unusable records
pub fn mixed_records() -> Vec<RawRecord> {
    vec![
        gene("ncbigene", "348", "348", "APOE"),
        gene("hgnc", "HGNC:613", "348", "APOE").with_xref("HGNC", "613"),
        gene("ncbigene", "351", "351", "APP"),
        RawRecord::node("uniprot", "P05067", "Gene")
            .with_xref("HGNC", "620")
            .with_xref("UniProt", "P05067"),
        RawRecord::node("hgnc", "HGNC:620", "Gene")
            .with_xref("HGNC", "620")
            .with_xref("NCBIGene", "351"),
        gene("ncbigene", "5663", "5663", "PSEN1"),
        disease("disgenet", "C0002395", "10652", "Alzheimer's disease"),
        disease("doid", "DOID:10652", "10652", "Alzheimer's disease").with_xref("UMLS", "C0002395"),
        association("disgenet", "348", "10652", Some(0.7)),
        association("string", "348", "10652", Some(0.9)),
        association("disgenet", "351", "10652", None),
        association("disgenet", "5663", "14330", Some(0.4)),
        RawRecord::edge("reactome", "geneInPathway", "5663", "R-HSA-977225")
            .with_source_namespace("NCBIGene"),
        RawRecord::node("broken", "  ", "Gene"),
        RawRecord::edge("broken", "geneRepairsSpaceship", "348", "x"),
    ]
}

pub fn shuffled(records: &[RawRecord], seed: u64) -> Vec<RawRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut records = records.to_vec();
    records.shuffle(&mut rng);
    records
}

/// Source-priority policy over the fixture sources; attribute outcomes
/// under it do not depend on arrival order
pub fn priority_policy() -> ConflictPolicy {
    ConflictPolicy::source_priority(["ncbigene", "hgnc", "doid", "disgenet", "uniprot"])
}

/// Assemble records in order, returning the graph and the rejections
pub fn assemble(
    records: &[RawRecord],
    policy: ConflictPolicy,
) -> (Vec<CanonicalEntity>, Vec<CanonicalEdge>, Vec<IngestError>) {
    let mut assembler = GraphAssembler::new(Schema::biomedical(), policy);
    let mut rejected = Vec::new();
    for record in records {
        if let Err(e) = assembler.ingest(record) {
            rejected.push(e);
        }
    }
    let (entities, edges) = assembler.finalize();
    (entities, edges, rejected)
}

/// An entity described by what it is rather than its minted id
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntityShape {
    pub entity_type: String,
    pub cross_references: Vec<String>,
    pub primary_name: String,
    pub sources: BTreeSet<String>,
    pub is_stub: bool,
}

/// An edge with endpoints named by their cross-reference sets
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub struct EdgeShape {
    pub source: Vec<String>,
    pub target: Vec<String>,
    pub edge_type: String,
    pub sources: BTreeSet<String>,
    pub confidence: Option<f64>,
}

pub struct GraphShape {
    pub entities: Vec<EntityShape>,
    pub edges: Vec<EdgeShape>,
}

pub fn shape(entities: &[CanonicalEntity], edges: &[CanonicalEdge]) -> GraphShape {
    let by_id: BTreeMap<&str, Vec<String>> = entities
        .iter()
        .map(|e| (e.canonical_id.as_str(), e.cross_reference_strings()))
        .collect();

    let mut entity_shapes: Vec<EntityShape> = entities
        .iter()
        .map(|e| EntityShape {
            entity_type: e.entity_type.clone(),
            cross_references: e.cross_reference_strings(),
            primary_name: e.primary_name.clone(),
            sources: e.contributing_sources.clone(),
            is_stub: e.is_stub,
        })
        .collect();
    entity_shapes.sort();

    let mut edge_shapes: Vec<EdgeShape> = edges
        .iter()
        .map(|e| EdgeShape {
            source: by_id[e.source_entity_id.as_str()].clone(),
            target: by_id[e.target_entity_id.as_str()].clone(),
            edge_type: e.edge_type.clone(),
            sources: e.contributing_sources.clone(),
            confidence: e.confidence,
        })
        .collect();
    edge_shapes.sort_by(|a, b| {
        (&a.source, &a.target, &a.edge_type).cmp(&(&b.source, &b.target, &b.edge_type))
    });

    GraphShape {
        entities: entity_shapes,
        edges: edge_shapes,
    }
}
