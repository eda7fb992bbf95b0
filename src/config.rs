//! Pipeline configuration loaded from YAML
//!
//! A config file names the sources to ingest and how to map their columns,
//! plus optional schema, conflict policy, pipeline tuning, and output
//! settings. Relative paths resolve against the config file's directory.
//!
//! ```yaml
//! conflict_policy:
//!   strategy: source_priority
//!   priority: [ncbigene]
//! output:
//!   directory: out
//!   prefix: alzkb
//!   date_stamp: true
//! sources:
//!   - name: ncbigene
//!     format: tsv
//!     path: data/genes.tsv
//!     node:
//!       entity_type: Gene
//!       id_column: GeneID
//!       cross_references: { GeneID: NCBIGene }
//!       attributes: { Symbol: geneSymbol }
//!   - name: scraper
//!     format: json_lines
//!     path: data/records.jsonl
//!     skip: true
//! ```

use crate::adapter::{
    EdgeMapping, IngestPipeline, JsonLinesAdapter, NodeMapping, PipelineError, PipelineSettings,
    SourceAdapter, TableMapping, TabularAdapter,
};
use crate::graph::ConflictPolicy;
use crate::schema::Schema;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Default prefix for exported file names
pub const DEFAULT_PREFIX: &str = "biokg";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("source '{0}' is declared twice")]
    DuplicateSource(String),
    #[error("source '{name}': {reason}")]
    InvalidSource { name: String, reason: String },
    #[error("source '{source_name}' maps unknown edge type '{edge_type}'")]
    UnknownEdgeType {
        source_name: String,
        edge_type: String,
    },
    #[error("could not determine a data directory; set output.directory")]
    NoDataDir,
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// On-disk format of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Tsv,
    Csv,
    JsonLines,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tsv => "tsv",
            Self::Csv => "csv",
            Self::JsonLines => "json_lines",
        }
    }
}

/// One data source
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Adapter id, also the namespace of the source's local ids
    pub name: String,
    pub format: SourceFormat,
    pub path: PathBuf,
    /// Keep the entry but leave it out of the run
    #[serde(default)]
    pub skip: bool,
    /// Overrides the format's default delimiter
    #[serde(default)]
    pub delimiter: Option<char>,
    #[serde(default)]
    pub node: Option<NodeMapping>,
    #[serde(default)]
    pub edge: Option<EdgeMapping>,
}

impl SourceConfig {
    fn table_mapping(&self) -> Result<TableMapping, ConfigError> {
        match (&self.node, &self.edge) {
            (Some(node), None) => Ok(TableMapping::Node(node.clone())),
            (None, Some(edge)) => Ok(TableMapping::Edge(edge.clone())),
            _ => Err(self.invalid("tabular sources need exactly one of 'node' or 'edge'")),
        }
    }

    fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        match (self.delimiter, self.format) {
            (Some(c), _) if c.is_ascii() => Ok(c as u8),
            (Some(c), _) => Err(self.invalid(format!("delimiter '{}' is not ASCII", c))),
            (None, SourceFormat::Csv) => Ok(b','),
            (None, _) => Ok(b'\t'),
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidSource {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }
}

fn default_timeout_secs() -> Option<u64> {
    Some(600)
}

fn default_channel_capacity() -> usize {
    1024
}

/// Pipeline tuning
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineTuning {
    /// Per-adapter time limit; `null` disables it
    #[serde(default = "default_timeout_secs")]
    pub adapter_timeout_secs: Option<u64>,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for PipelineTuning {
    fn default() -> Self {
        Self {
            adapter_timeout_secs: default_timeout_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

/// Where and how exported tables are written
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Append `_YYYYMMDD` to table file names
    #[serde(default)]
    pub date_stamp: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: None,
            prefix: default_prefix(),
            date_stamp: false,
        }
    }
}

/// A complete pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Defaults to the biomedical vocabulary
    #[serde(default)]
    pub schema: Option<Schema>,
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
    #[serde(default)]
    pub pipeline: PipelineTuning,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    /// Directory relative paths resolve against
    #[serde(skip)]
    base_dir: PathBuf,
}

impl PipelineConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_yaml_str(&text, base_dir)
    }

    /// Parse and validate config text
    pub fn from_yaml_str(text: &str, base_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let mut config: PipelineConfig = serde_yaml::from_str(text)?;
        config.base_dir = base_dir.into();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let schema = self.schema();
        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(source.invalid("name must not be empty"));
            }
            if !names.insert(source.name.as_str()) {
                return Err(ConfigError::DuplicateSource(source.name.clone()));
            }
            match source.format {
                SourceFormat::Tsv | SourceFormat::Csv => {
                    source.delimiter_byte()?;
                    if let TableMapping::Edge(edge) = source.table_mapping()? {
                        if schema.edge_type(&edge.edge_type).is_none() {
                            return Err(ConfigError::UnknownEdgeType {
                                source_name: source.name.clone(),
                                edge_type: edge.edge_type,
                            });
                        }
                    }
                }
                SourceFormat::JsonLines => {
                    if source.node.is_some() || source.edge.is_some() {
                        return Err(source.invalid("json_lines sources take no column mapping"));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn schema(&self) -> Schema {
        self.schema.clone().unwrap_or_else(Schema::biomedical)
    }

    pub fn settings(&self) -> PipelineSettings {
        PipelineSettings {
            adapter_timeout: self.pipeline.adapter_timeout_secs.map(Duration::from_secs),
            channel_capacity: self.pipeline.channel_capacity,
        }
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Configured output directory, else `<data dir>/biokg`
    pub fn output_directory(&self) -> Result<PathBuf, ConfigError> {
        match &self.output.directory {
            Some(dir) => Ok(self.resolve_path(dir)),
            None => dirs::data_dir()
                .map(|dir| dir.join("biokg"))
                .ok_or(ConfigError::NoDataDir),
        }
    }

    /// Sources that take part in a run
    pub fn active_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| !s.skip)
    }

    pub fn build_adapter(&self, source: &SourceConfig) -> Result<Box<dyn SourceAdapter>, ConfigError> {
        let path = self.resolve_path(&source.path);
        Ok(match source.format {
            SourceFormat::Tsv | SourceFormat::Csv => Box::new(
                TabularAdapter::new(source.name.as_str(), path, source.table_mapping()?)
                    .with_delimiter(source.delimiter_byte()?),
            ),
            SourceFormat::JsonLines => Box::new(JsonLinesAdapter::new(source.name.as_str(), path)),
        })
    }

    /// Build a pipeline with one adapter per active source
    pub fn build_pipeline(&self) -> Result<IngestPipeline, ConfigError> {
        let mut pipeline = IngestPipeline::new(self.schema(), self.conflict_policy.clone())
            .with_settings(self.settings());
        for source in &self.sources {
            if source.skip {
                info!(source = %source.name, "skipping source");
                continue;
            }
            pipeline.register_adapter(self.build_adapter(source)?)?;
        }
        Ok(pipeline)
    }
}
