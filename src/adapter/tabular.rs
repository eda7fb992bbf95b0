//! Tabular adapter: one delimited file describing either nodes or edges
//!
//! Column mappings are declared in the pipeline config. A node table maps
//! an id column, cross-reference columns (column → namespace), and
//! attribute columns (column → attribute name). An edge table maps its
//! subject and object columns, each optionally matched in an explicit
//! namespace, plus an optional confidence column.

use super::sink::{AdapterError, RecordSink};
use super::traits::SourceAdapter;
use super::types::{clean_text, RawRecord};
use async_trait::async_trait;
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Column mapping for a node table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMapping {
    pub entity_type: String,
    /// Column holding the source-local id
    pub id_column: String,
    /// Column name → namespace
    #[serde(default)]
    pub cross_references: BTreeMap<String, String>,
    /// Column name → attribute name
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// Column mapping for a relationship table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeMapping {
    pub edge_type: String,
    pub source_column: String,
    /// Match the subject as a cross-reference in this namespace
    #[serde(default)]
    pub source_namespace: Option<String>,
    pub target_column: String,
    #[serde(default)]
    pub target_namespace: Option<String>,
    #[serde(default)]
    pub confidence_column: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// What a table describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableMapping {
    Node(NodeMapping),
    Edge(EdgeMapping),
}

/// Header-resolved form of a `TableMapping`
#[derive(Debug)]
enum RowMapper {
    Node {
        entity_type: String,
        id: usize,
        cross_references: Vec<(usize, String)>,
        attributes: Vec<(usize, String)>,
    },
    Edge {
        edge_type: String,
        source: usize,
        source_namespace: Option<String>,
        target: usize,
        target_namespace: Option<String>,
        confidence: Option<usize>,
        attributes: Vec<(usize, String)>,
    },
}

fn column(headers: &StringRecord, name: &str) -> Result<usize, AdapterError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| AdapterError::InvalidInput(format!("missing column '{}'", name)))
}

fn columns(
    headers: &StringRecord,
    mapping: &BTreeMap<String, String>,
) -> Result<Vec<(usize, String)>, AdapterError> {
    mapping
        .iter()
        .map(|(col, target)| Ok((column(headers, col)?, target.clone())))
        .collect()
}

fn cell(row: &StringRecord, index: usize) -> String {
    clean_text(row.get(index).unwrap_or(""))
}

impl RowMapper {
    fn resolve(mapping: &TableMapping, headers: &StringRecord) -> Result<Self, AdapterError> {
        Ok(match mapping {
            TableMapping::Node(node) => Self::Node {
                entity_type: node.entity_type.clone(),
                id: column(headers, &node.id_column)?,
                cross_references: columns(headers, &node.cross_references)?,
                attributes: columns(headers, &node.attributes)?,
            },
            TableMapping::Edge(edge) => Self::Edge {
                edge_type: edge.edge_type.clone(),
                source: column(headers, &edge.source_column)?,
                source_namespace: edge.source_namespace.clone(),
                target: column(headers, &edge.target_column)?,
                target_namespace: edge.target_namespace.clone(),
                confidence: edge
                    .confidence_column
                    .as_deref()
                    .map(|c| column(headers, c))
                    .transpose()?,
                attributes: columns(headers, &edge.attributes)?,
            },
        })
    }

    fn map(&self, source_name: &str, row: &StringRecord, line: u64) -> RawRecord {
        match self {
            Self::Node {
                entity_type,
                id,
                cross_references,
                attributes,
            } => {
                let mut record = RawRecord::node(source_name, cell(row, *id), entity_type.as_str());
                for (index, namespace) in cross_references {
                    let value = cell(row, *index);
                    if !value.is_empty() {
                        record = record.with_xref(namespace.as_str(), value);
                    }
                }
                with_attributes(record, row, attributes)
            }
            Self::Edge {
                edge_type,
                source,
                source_namespace,
                target,
                target_namespace,
                confidence,
                attributes,
            } => {
                let mut record = RawRecord::edge(
                    source_name,
                    edge_type.as_str(),
                    cell(row, *source),
                    cell(row, *target),
                );
                if let Some(ns) = source_namespace {
                    record = record.with_source_namespace(ns.as_str());
                }
                if let Some(ns) = target_namespace {
                    record = record.with_target_namespace(ns.as_str());
                }
                if let Some(index) = confidence {
                    let raw = cell(row, *index);
                    if !raw.is_empty() {
                        match raw.parse::<f64>() {
                            Ok(value) => record = record.with_confidence(value),
                            Err(_) => warn!(
                                source = source_name,
                                line,
                                value = %raw,
                                "ignoring unparseable confidence"
                            ),
                        }
                    }
                }
                with_attributes(record, row, attributes)
            }
        }
    }
}

fn with_attributes(mut record: RawRecord, row: &StringRecord, attributes: &[(usize, String)]) -> RawRecord {
    for (index, name) in attributes {
        let value = cell(row, *index);
        if !value.is_empty() {
            record = record.with_attribute(name.as_str(), value);
        }
    }
    record
}

/// Reads a TSV/CSV file with a header row on a blocking thread
#[derive(Debug, Clone)]
pub struct TabularAdapter {
    id: String,
    path: PathBuf,
    delimiter: u8,
    mapping: TableMapping,
}

impl TabularAdapter {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>, mapping: TableMapping) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            delimiter: b'\t',
            mapping,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn read_all(&self, sink: &RecordSink) -> Result<(), AdapterError> {
        let file = File::open(&self.path).map_err(|source| AdapterError::Io {
            path: self.path.clone(),
            source,
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(BufReader::new(file));

        let headers = reader.headers()?.clone();
        let mapper = RowMapper::resolve(&self.mapping, &headers)?;

        let mut rows = 0usize;
        for result in reader.records() {
            match result {
                Ok(row) => {
                    let line = row.position().map(|p| p.line()).unwrap_or(0);
                    sink.emit_blocking(mapper.map(&self.id, &row, line))?;
                    rows += 1;
                }
                Err(e) => {
                    sink.report_unparseable_blocking(format!("{}: {}", self.path.display(), e))?;
                }
            }
        }

        debug!(adapter = %self.id, path = %self.path.display(), rows, "finished reading table");
        Ok(())
    }
}

#[async_trait]
impl SourceAdapter for TabularAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn produce(self: Box<Self>, sink: RecordSink) -> Result<(), AdapterError> {
        tokio::task::spawn_blocking(move || self.read_all(&sink))
            .await
            .map_err(|e| AdapterError::Internal(format!("table reader task failed: {}", e)))?
    }
}
