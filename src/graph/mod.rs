//! Canonical graph: entities, edges, and the assembler that builds them

mod assembler;
mod conflict;
mod edge;
mod error;
mod node;


pub use assembler::{AssemblyStats, GraphAssembler, Ingested};
pub use conflict::ConflictPolicy;
pub use edge::{merge_confidence, CanonicalEdge, EdgeKey};
pub use error::{IngestError, RejectionKind};
pub use node::{AttributeValue, Attributes, CanonicalEntity, CanonicalId, CrossReferences};
