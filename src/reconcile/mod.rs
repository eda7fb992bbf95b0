//! Identifier reconciliation
//!
//! Maps source-local identifiers and cross-references onto canonical
//! entity ids for the duration of one pipeline run.

mod index;
mod reconciler;

pub use index::{Identifier, ReconciliationIndex};
pub use reconciler::{record_identifiers, Reconciler, Resolution};
