//! Source adapter layer
//!
//! Adapters turn per-source input into `RawRecord`s and push them through
//! a `RecordSink`; the `IngestPipeline` runs them concurrently and funnels
//! their records into a single graph writer.

mod cancel;
pub mod ingest;
pub mod jsonl;
pub mod memory;
mod sink;
pub mod tabular;
mod traits;
mod types;

pub use cancel::CancellationToken;
pub use ingest::{IngestPipeline, PipelineError, PipelineOutput, PipelineSettings, RunState};
pub use jsonl::JsonLinesAdapter;
pub use memory::MemoryAdapter;
pub use sink::{AdapterError, Envelope, RecordSink};
pub use tabular::{EdgeMapping, NodeMapping, TableMapping, TabularAdapter};
pub use traits::SourceAdapter;
pub use types::{clean_text, EdgeFields, RawRecord, RecordKind};
