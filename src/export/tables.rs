//! CSV node and edge tables plus the JSON run summary
//!
//! Multi-valued cells are sorted and joined with `|`; cross-references are
//! written as `namespace:id`. Empty tables still get a header row.

use crate::graph::{CanonicalEdge, CanonicalEntity};
use crate::report::RunSummary;
use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const NODE_HEADER: [&str; 5] = ["id", "type", "name", "cross_references", "sources"];
pub const EDGE_HEADER: [&str; 5] = ["source_id", "target_id", "type", "sources", "confidence"];

const MULTI_VALUE_SEPARATOR: &str = "|";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to serialize summary: {0}")]
    Json(#[from] serde_json::Error),
}

/// Files written by one export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub nodes: PathBuf,
    pub edges: PathBuf,
    pub summary: PathBuf,
}

/// Writes `{prefix}_nodes[_{YYYYMMDD}].csv`, `{prefix}_edges[...].csv` and
/// `{prefix}_summary[...].json` into one directory
#[derive(Debug, Clone)]
pub struct CsvExporter {
    directory: PathBuf,
    prefix: String,
    date_stamp: Option<NaiveDate>,
}

impl CsvExporter {
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
            date_stamp: None,
        }
    }

    /// Suffix file names with the given date
    pub fn with_date_stamp(mut self, date: NaiveDate) -> Self {
        self.date_stamp = Some(date);
        self
    }

    fn file_name(&self, table: &str, extension: &str) -> PathBuf {
        let name = match self.date_stamp {
            Some(date) => format!("{}_{}_{}.{}", self.prefix, table, date.format("%Y%m%d"), extension),
            None => format!("{}_{}.{}", self.prefix, table, extension),
        };
        self.directory.join(name)
    }

    pub fn paths(&self) -> ExportPaths {
        ExportPaths {
            nodes: self.file_name("nodes", "csv"),
            edges: self.file_name("edges", "csv"),
            summary: self.file_name("summary", "json"),
        }
    }

    fn ensure_directory(&self) -> Result<(), ExportError> {
        std::fs::create_dir_all(&self.directory).map_err(|source| ExportError::Io {
            path: self.directory.clone(),
            source,
        })
    }

    /// Write only the run summary, as after an aborted run
    pub fn export_summary(&self, summary: &RunSummary) -> Result<PathBuf, ExportError> {
        self.ensure_directory()?;
        let path = self.paths().summary;
        write_summary(&path, summary)?;
        Ok(path)
    }

    /// Write both tables and the summary, creating the directory if needed
    pub fn export(
        &self,
        entities: &[CanonicalEntity],
        edges: &[CanonicalEdge],
        summary: &RunSummary,
    ) -> Result<ExportPaths, ExportError> {
        self.ensure_directory()?;

        let paths = self.paths();
        write_nodes(&paths.nodes, entities)?;
        write_edges(&paths.edges, edges)?;
        write_summary(&paths.summary, summary)?;

        info!(
            nodes = entities.len(),
            edges = edges.len(),
            directory = %self.directory.display(),
            "exported graph tables"
        );
        Ok(paths)
    }
}

fn join_sorted<'a>(values: impl IntoIterator<Item = &'a String>) -> String {
    let mut values: Vec<&str> = values.into_iter().map(String::as_str).collect();
    values.sort_unstable();
    values.join(MULTI_VALUE_SEPARATOR)
}

pub fn write_nodes(path: &Path, entities: &[CanonicalEntity]) -> Result<(), ExportError> {
    if entities.is_empty() {
        warn!(path = %path.display(), "node table is empty");
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(NODE_HEADER)?;
    for entity in entities {
        let cross_references = join_sorted(&entity.cross_reference_strings());
        let sources = join_sorted(&entity.contributing_sources);
        writer.write_record([
            entity.canonical_id.as_str(),
            entity.entity_type.as_str(),
            entity.primary_name.as_str(),
            cross_references.as_str(),
            sources.as_str(),
        ])?;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

pub fn write_edges(path: &Path, edges: &[CanonicalEdge]) -> Result<(), ExportError> {
    if edges.is_empty() {
        warn!(path = %path.display(), "edge table is empty");
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(EDGE_HEADER)?;
    for edge in edges {
        let sources = join_sorted(&edge.contributing_sources);
        let confidence = edge.confidence.map(|c| c.to_string()).unwrap_or_default();
        writer.write_record([
            edge.source_entity_id.as_str(),
            edge.target_entity_id.as_str(),
            edge.edge_type.as_str(),
            sources.as_str(),
            confidence.as_str(),
        ])?;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<(), ExportError> {
    let file = File::create(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{CanonicalId, CrossReferences};
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn apoe() -> CanonicalEntity {
        let mut cross_references = CrossReferences::new();
        cross_references.entry("NCBIGene".into()).or_default().insert("348".into());
        cross_references.entry("HGNC".into()).or_default().insert("613".into());
        CanonicalEntity {
            canonical_id: CanonicalId::from("g-1"),
            entity_type: "Gene".into(),
            primary_name: "APOE".into(),
            cross_references,
            contributing_sources: BTreeSet::from(["ncbigene".to_string(), "hgnc".to_string()]),
            attributes: Default::default(),
            is_stub: false,
        }
    }

    fn association(confidence: Option<f64>) -> CanonicalEdge {
        CanonicalEdge {
            source_entity_id: CanonicalId::from("g-1"),
            target_entity_id: CanonicalId::from("d-1"),
            edge_type: "geneAssociatesWithDisease".into(),
            contributing_sources: BTreeSet::from(["string".to_string(), "disgenet".to_string()]),
            confidence,
            attributes: Default::default(),
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn file_names_follow_prefix_and_date() {
        let plain = CsvExporter::new("/out", "alzkb");
        assert_eq!(plain.paths().nodes, PathBuf::from("/out/alzkb_nodes.csv"));
        assert_eq!(plain.paths().summary, PathBuf::from("/out/alzkb_summary.json"));

        let stamped = plain.with_date_stamp(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
        assert_eq!(stamped.paths().edges, PathBuf::from("/out/alzkb_edges_20240307.csv"));
    }

    #[test]
    fn tables_have_sorted_pipe_joined_cells() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path().join("nested"), "kg");
        let paths = exporter
            .export(
                &[apoe()],
                &[association(Some(0.9)), association(None)],
                &RunSummary::new(Utc::now()),
            )
            .unwrap();

        let nodes = read_rows(&paths.nodes);
        assert_eq!(nodes[0], NODE_HEADER);
        assert_eq!(nodes[1], vec!["g-1", "Gene", "APOE", "HGNC:613|NCBIGene:348", "hgnc|ncbigene"]);

        let edges = read_rows(&paths.edges);
        assert_eq!(edges[0], EDGE_HEADER);
        assert_eq!(
            edges[1],
            vec!["g-1", "d-1", "geneAssociatesWithDisease", "disgenet|string", "0.9"]
        );
        assert_eq!(edges[2][4], "");

        let summary: serde_json::Value =
            serde_json::from_reader(File::open(&paths.summary).unwrap()).unwrap();
        assert_eq!(summary["entities"], 0);
    }

    #[test]
    fn empty_tables_still_get_headers() {
        let dir = tempfile::tempdir().unwrap();
        let paths = CsvExporter::new(dir.path(), "empty")
            .export(&[], &[], &RunSummary::new(Utc::now()))
            .unwrap();

        assert_eq!(read_rows(&paths.nodes), vec![NODE_HEADER.to_vec()]);
        assert_eq!(read_rows(&paths.edges), vec![EDGE_HEADER.to_vec()]);
    }

    #[test]
    fn aborted_run_writes_summary_alone() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path(), "kg");
        let mut summary = RunSummary::new(Utc::now());
        summary.aborted = Some("canonical id minted twice".into());

        let path = exporter.export_summary(&summary).unwrap();
        assert!(path.exists());
        assert!(!exporter.paths().nodes.exists());
    }

    #[test]
    fn names_with_delimiters_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let mut entity = apoe();
        entity.primary_name = "apolipoprotein E, \"APOE\"".into();
        let path = dir.path().join("nodes.csv");
        write_nodes(&path, &[entity]).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows[1][2], "apolipoprotein E, \"APOE\"");
    }
}
