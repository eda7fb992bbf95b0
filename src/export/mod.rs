//! Export of the assembled graph for graph-database import

mod tables;

pub use tables::{CsvExporter, ExportError, ExportPaths, EDGE_HEADER, NODE_HEADER};
