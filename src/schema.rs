//! Entity and edge type vocabulary
//!
//! Entity types are an open set: nodes of undeclared types are accepted.
//! Edge types are a fixed vocabulary, and each declares the entity types of
//! its endpoints so that stubs can be typed when an edge arrives before (or
//! without) its node records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_name_field() -> String {
    "name".to_string()
}

fn default_true() -> bool {
    true
}

/// Expected shape of one entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTypeSpec {
    pub name: String,
    /// Attribute holding the display name
    #[serde(default = "default_name_field")]
    pub name_field: String,
    /// Attributes every node record of this type must carry
    #[serde(default)]
    pub required_fields: Vec<String>,
}

impl EntityTypeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_field: default_name_field(),
            required_fields: Vec::new(),
        }
    }

    pub fn with_name_field(mut self, field: impl Into<String>) -> Self {
        self.name_field = field.into();
        self
    }

    pub fn with_required_field(mut self, field: impl Into<String>) -> Self {
        self.required_fields.push(field.into());
        self
    }
}

/// One entry in the edge vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeTypeSpec {
    pub name: String,
    /// Entity type of the edge's source endpoint
    pub source_type: String,
    /// Entity type of the edge's target endpoint
    pub target_type: String,
    #[serde(default = "default_true")]
    pub allow_self_loops: bool,
    #[serde(default)]
    pub required_fields: Vec<String>,
}

impl EdgeTypeSpec {
    pub fn new(
        name: impl Into<String>,
        source_type: impl Into<String>,
        target_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source_type: source_type.into(),
            target_type: target_type.into(),
            allow_self_loops: true,
            required_fields: Vec::new(),
        }
    }

    pub fn forbid_self_loops(mut self) -> Self {
        self.allow_self_loops = false;
        self
    }

    pub fn with_required_field(mut self, field: impl Into<String>) -> Self {
        self.required_fields.push(field.into());
        self
    }
}

/// Serialized form: two lists, keyed by name once loaded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SchemaDocument {
    #[serde(default)]
    entity_types: Vec<EntityTypeSpec>,
    #[serde(default)]
    edge_types: Vec<EdgeTypeSpec>,
}

/// The vocabulary a pipeline run validates records against
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SchemaDocument", into = "SchemaDocument")]
pub struct Schema {
    entity_types: BTreeMap<String, EntityTypeSpec>,
    edge_types: BTreeMap<String, EdgeTypeSpec>,
}

impl From<SchemaDocument> for Schema {
    fn from(doc: SchemaDocument) -> Self {
        let mut schema = Schema::default();
        for spec in doc.entity_types {
            schema = schema.with_entity_type(spec);
        }
        for spec in doc.edge_types {
            schema = schema.with_edge_type(spec);
        }
        schema
    }
}

impl From<Schema> for SchemaDocument {
    fn from(schema: Schema) -> Self {
        Self {
            entity_types: schema.entity_types.into_values().collect(),
            edge_types: schema.edge_types.into_values().collect(),
        }
    }
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity_type(mut self, spec: EntityTypeSpec) -> Self {
        self.entity_types.insert(spec.name.clone(), spec);
        self
    }

    pub fn with_edge_type(mut self, spec: EdgeTypeSpec) -> Self {
        self.edge_types.insert(spec.name.clone(), spec);
        self
    }

    pub fn entity_type(&self, name: &str) -> Option<&EntityTypeSpec> {
        self.entity_types.get(name)
    }

    pub fn edge_type(&self, name: &str) -> Option<&EdgeTypeSpec> {
        self.edge_types.get(name)
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &EntityTypeSpec> {
        self.entity_types.values()
    }

    pub fn edge_types(&self) -> impl Iterator<Item = &EdgeTypeSpec> {
        self.edge_types.values()
    }

    pub fn is_known_entity_type(&self, name: &str) -> bool {
        self.entity_types.contains_key(name)
    }

    /// Attribute used as display name for an entity type
    pub fn name_field(&self, entity_type: &str) -> &str {
        self.entity_types
            .get(entity_type)
            .map(|s| s.name_field.as_str())
            .unwrap_or("name")
    }

    /// Edge types whose endpoints reference undeclared entity types.
    ///
    /// Edges of these types are rejected at ingest time; `check` reports
    /// them up front.
    pub fn dangling_edge_types(&self) -> Vec<(&str, &str)> {
        let mut dangling = Vec::new();
        for spec in self.edge_types.values() {
            for endpoint in [&spec.source_type, &spec.target_type] {
                if !self.is_known_entity_type(endpoint) {
                    dangling.push((spec.name.as_str(), endpoint.as_str()));
                }
            }
        }
        dangling
    }

    /// The AlzKB vocabulary of biomedical entity and relationship types
    pub fn biomedical() -> Self {
        let mut schema = Self::new()
            .with_entity_type(EntityTypeSpec::new("Gene").with_name_field("geneSymbol"))
            .with_entity_type(EntityTypeSpec::new("Disease").with_name_field("commonName"))
            .with_entity_type(EntityTypeSpec::new("Drug").with_name_field("commonName"))
            .with_entity_type(EntityTypeSpec::new("Pathway").with_name_field("pathwayName"))
            .with_entity_type(EntityTypeSpec::new("TranscriptionFactor").with_name_field("TF"))
            .with_entity_type(EntityTypeSpec::new("BiologicalProcess").with_name_field("commonName"))
            .with_entity_type(EntityTypeSpec::new("BodyPart").with_name_field("bodyPartName"))
            .with_entity_type(EntityTypeSpec::new("Symptom").with_name_field("commonName"));

        for (name, source, target) in [
            ("geneInPathway", "Gene", "Pathway"),
            ("geneAssociatesWithDisease", "Gene", "Disease"),
            ("transcriptionFactorInteractsWithGene", "TranscriptionFactor", "Gene"),
            ("diseaseLocalizesToAnatomy", "Disease", "BodyPart"),
            ("geneParticipatesInBiologicalProcess", "Gene", "BiologicalProcess"),
            ("drugTreatsDisease", "Drug", "Disease"),
            ("chemicalBindsGene", "Drug", "Gene"),
            ("bodyPartOverexpressesGene", "BodyPart", "Gene"),
            ("chemicalIncreasesExpression", "Drug", "Gene"),
            ("geneInteractsWithGene", "Gene", "Gene"),
            ("diseaseAssociatesWithDisease", "Disease", "Disease"),
        ] {
            schema = schema.with_edge_type(EdgeTypeSpec::new(name, source, target));
        }
        schema
    }
}
