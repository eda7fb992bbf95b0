//! biokg: Biomedical Knowledge-Graph Assembly
//!
//! Integrates independent biomedical sources into one deduplicated graph
//! with stable identifiers, ready for graph-database import.
//!
//! # Core Concepts
//!
//! - **Adapters**: per-source producers of raw node and edge records
//! - **Reconciliation**: records sharing an identifier within an entity type
//!   collapse into one canonical entity, merging transitively
//! - **Assembly**: edges are resolved to canonical endpoints and deduplicated
//!   by (source, target, type)
//!
//! # Example
//!
//! ```
//! use biokg::{ConflictPolicy, IngestPipeline, MemoryAdapter, RawRecord, Schema};
//!
//! # tokio_test_block(async {
//! let mut pipeline = IngestPipeline::new(Schema::biomedical(), ConflictPolicy::default());
//! pipeline
//!     .register_adapter(Box::new(MemoryAdapter::new(
//!         "ncbigene",
//!         vec![RawRecord::node("ncbigene", "348", "Gene").with_xref("NCBIGene", "348")],
//!     )))
//!     .unwrap();
//! let output = pipeline.run().await.unwrap();
//! assert_eq!(output.entities.len(), 1);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod export;
mod graph;
pub mod reconcile;
pub mod report;
pub mod schema;

pub use adapter::{
    AdapterError, IngestPipeline, JsonLinesAdapter, MemoryAdapter, PipelineError, PipelineOutput,
    PipelineSettings, RawRecord, RecordKind, RunState, SourceAdapter, TabularAdapter,
};
pub use config::{ConfigError, PipelineConfig};
pub use export::{CsvExporter, ExportError, ExportPaths};
pub use graph::{
    merge_confidence, AssemblyStats, AttributeValue, Attributes, CanonicalEdge, CanonicalEntity,
    CanonicalId, ConflictPolicy, CrossReferences, EdgeKey, GraphAssembler, IngestError, Ingested,
    RejectionKind,
};
pub use reconcile::{Identifier, Reconciler};
pub use report::{AdapterOutcome, RunSummary, SourceSummary};
pub use schema::{EdgeTypeSpec, EntityTypeSpec, Schema};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
