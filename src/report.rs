//! Run summary: per-source counts and final graph statistics
//!
//! The summary is the primary failure signal of a run. It is logged at the
//! end of every run and written next to the exported tables.

use crate::graph::{CanonicalEdge, CanonicalEntity, RejectionKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// How one adapter's run ended
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdapterOutcome {
    #[default]
    Completed,
    Failed {
        error: String,
    },
    TimedOut {
        after_secs: f64,
    },
    /// Stopped by a run-wide abort
    Cancelled,
}

impl AdapterOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Counts for one source adapter
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceSummary {
    pub records_received: usize,
    pub nodes_accepted: usize,
    pub edges_accepted: usize,
    /// Rejection kind → count
    pub rejected: BTreeMap<String, usize>,
    pub outcome: AdapterOutcome,
}

impl SourceSummary {
    pub fn record_rejection(&mut self, kind: RejectionKind) {
        *self.rejected.entry(kind.as_str().to_string()).or_insert(0) += 1;
    }

    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }

    pub fn rejected_of(&self, kind: RejectionKind) -> usize {
        self.rejected.get(kind.as_str()).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub sources: BTreeMap<String, SourceSummary>,
    pub entities: usize,
    pub stub_entities: usize,
    pub edges: usize,
    pub merges: usize,
    /// Entity type → count
    pub entity_types: BTreeMap<String, usize>,
    /// Edge type → count
    pub edge_types: BTreeMap<String, usize>,
    /// Set when a fatal error stopped the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl RunSummary {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: None,
            sources: BTreeMap::new(),
            entities: 0,
            stub_entities: 0,
            edges: 0,
            merges: 0,
            entity_types: BTreeMap::new(),
            edge_types: BTreeMap::new(),
            aborted: None,
        }
    }

    pub fn source_mut(&mut self, adapter: &str) -> &mut SourceSummary {
        self.sources.entry(adapter.to_string()).or_default()
    }

    pub fn source(&self, adapter: &str) -> Option<&SourceSummary> {
        self.sources.get(adapter)
    }

    /// Fill in graph statistics from the finalized tables
    pub fn record_graph(&mut self, entities: &[CanonicalEntity], edges: &[CanonicalEdge], merges: usize) {
        self.entities = entities.len();
        self.stub_entities = entities.iter().filter(|e| e.is_stub).count();
        self.edges = edges.len();
        self.merges = merges;
        self.entity_types.clear();
        for entity in entities {
            *self.entity_types.entry(entity.entity_type.clone()).or_insert(0) += 1;
        }
        self.edge_types.clear();
        for edge in edges {
            *self.edge_types.entry(edge.edge_type.clone()).or_insert(0) += 1;
        }
    }

    pub fn rejected_total(&self) -> usize {
        self.sources.values().map(SourceSummary::rejected_total).sum()
    }

    /// True when every adapter completed and nothing aborted the run
    pub fn is_clean(&self) -> bool {
        self.aborted.is_none() && self.sources.values().all(|s| s.outcome.is_completed())
    }

    /// Emit the summary through `tracing`
    pub fn log(&self) {
        for (name, source) in &self.sources {
            info!(
                source = %name,
                received = source.records_received,
                nodes = source.nodes_accepted,
                edges = source.edges_accepted,
                rejected = source.rejected_total(),
                "source summary"
            );
            for (kind, count) in &source.rejected {
                info!(source = %name, kind = %kind, count, "rejected records");
            }
            match &source.outcome {
                AdapterOutcome::Completed => {}
                AdapterOutcome::Failed { error } => {
                    warn!(source = %name, error = %error, "adapter failed; partial data kept")
                }
                AdapterOutcome::TimedOut { after_secs } => {
                    warn!(source = %name, after_secs, "adapter timed out; partial data kept")
                }
                AdapterOutcome::Cancelled => warn!(source = %name, "adapter cancelled"),
            }
        }
        for (entity_type, count) in &self.entity_types {
            info!(entity_type = %entity_type, count, "entities by type");
        }
        for (edge_type, count) in &self.edge_types {
            info!(edge_type = %edge_type, count, "edges by type");
        }
        info!(
            entities = self.entities,
            stubs = self.stub_entities,
            edges = self.edges,
            merges = self.merges,
            rejected = self.rejected_total(),
            "graph assembled"
        );
    }
}
