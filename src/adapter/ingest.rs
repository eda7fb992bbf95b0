//! Ingest pipeline: concurrent adapters, single writer
//!
//! Pipeline steps:
//! 1. Each registered adapter runs as its own tokio task, pushing records
//!    into a bounded channel through its `RecordSink`
//! 2. The writer (the `run` future itself) owns the `GraphAssembler` and
//!    applies records in arrival order, counting rejections per source
//! 3. When every adapter has finished, timed out, or failed, the assembler
//!    is finalized into sorted node and edge tables
//!
//! A fatal invariant violation cancels every adapter and aborts the run.

use super::cancel::CancellationToken;
use super::sink::{AdapterError, Envelope, RecordSink};
use super::traits::SourceAdapter;
use crate::graph::{
    CanonicalEdge, CanonicalEntity, ConflictPolicy, GraphAssembler, IngestError, Ingested,
    RejectionKind,
};
use crate::report::{AdapterOutcome, RunSummary};
use crate::schema::Schema;
use chrono::Utc;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Lifecycle of a pipeline. A pipeline runs at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Ingesting,
    Finalizing,
    Done,
}

/// Tuning knobs for a run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Per-adapter wall-clock limit; `None` waits indefinitely
    pub adapter_timeout: Option<Duration>,
    /// Capacity of the record channel between adapters and the writer
    pub channel_capacity: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            adapter_timeout: Some(Duration::from_secs(600)),
            channel_capacity: 1024,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline has already run")]
    AlreadyRun,
    #[error("adapter '{0}' registered twice")]
    DuplicateAdapter(String),
    #[error("run aborted by '{adapter}': {source}")]
    Fatal {
        adapter: String,
        #[source]
        source: IngestError,
        /// Counts up to the abort
        summary: Box<RunSummary>,
    },
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub entities: Vec<CanonicalEntity>,
    pub edges: Vec<CanonicalEdge>,
    pub summary: RunSummary,
}

/// The ingest pipeline.
///
/// Register adapters, then call `run()` once. All graph writes happen on
/// the writer; adapters only ever see their sink.
pub struct IngestPipeline {
    schema: Schema,
    policy: ConflictPolicy,
    settings: PipelineSettings,
    adapters: Vec<Box<dyn SourceAdapter>>,
    adapter_ids: HashSet<String>,
    state: RunState,
}

impl IngestPipeline {
    pub fn new(schema: Schema, policy: ConflictPolicy) -> Self {
        Self {
            schema,
            policy,
            settings: PipelineSettings::default(),
            adapters: Vec::new(),
            adapter_ids: HashSet::new(),
            state: RunState::Idle,
        }
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Register an adapter. Adapter ids must be unique within a pipeline.
    pub fn register_adapter(&mut self, adapter: Box<dyn SourceAdapter>) -> Result<(), PipelineError> {
        if self.state != RunState::Idle {
            return Err(PipelineError::AlreadyRun);
        }
        if !self.adapter_ids.insert(adapter.id().to_string()) {
            return Err(PipelineError::DuplicateAdapter(adapter.id().to_string()));
        }
        self.adapters.push(adapter);
        Ok(())
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// Run every adapter to completion and assemble the graph.
    pub async fn run(&mut self) -> Result<PipelineOutput, PipelineError> {
        if self.state != RunState::Idle {
            return Err(PipelineError::AlreadyRun);
        }
        self.state = RunState::Ingesting;

        let mut summary = RunSummary::new(Utc::now());
        let mut assembler = GraphAssembler::new(self.schema.clone(), self.policy.clone());
        let run_cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel::<Envelope>(self.settings.channel_capacity.max(1));

        let adapters = std::mem::take(&mut self.adapters);
        info!(adapters = adapters.len(), "starting ingest");
        let mut tasks = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            let id = adapter.id().to_string();
            summary.source_mut(&id);
            let cancel = run_cancel.child();
            let sink = RecordSink::new(id.clone(), tx.clone(), cancel.clone());
            let handle = spawn_adapter(adapter, sink, cancel, self.settings.adapter_timeout);
            tasks.push((id, handle));
        }
        drop(tx);

        let mut fatal: Option<(String, IngestError)> = None;
        while let Some(envelope) = rx.recv().await {
            match envelope {
                Envelope::Record { adapter, record } => {
                    let source = summary.source_mut(&adapter);
                    source.records_received += 1;
                    match assembler.ingest(&record) {
                        Ok(Ingested::Node { .. }) => source.nodes_accepted += 1,
                        Ok(Ingested::Edge { .. }) => source.edges_accepted += 1,
                        Err(e) if e.is_fatal() => {
                            error!(adapter = %adapter, record = %record.describe(), error = %e, "fatal invariant violation");
                            source.record_rejection(e.kind());
                            fatal = Some((adapter, e));
                            break;
                        }
                        Err(e) => {
                            debug!(adapter = %adapter, record = %record.describe(), error = %e, "rejected record");
                            source.record_rejection(e.kind());
                        }
                    }
                }
                Envelope::Unparseable { adapter, reason } => {
                    warn!(adapter = %adapter, reason = %reason, "unparseable input");
                    let source = summary.source_mut(&adapter);
                    source.records_received += 1;
                    source.record_rejection(RejectionKind::MalformedRecord);
                }
            }
        }

        if fatal.is_some() {
            run_cancel.cancel();
        }
        // Closing the receiver unblocks adapters still waiting on capacity
        drop(rx);

        for (id, handle) in tasks {
            if fatal.is_some() {
                handle.abort();
            }
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) if e.is_cancelled() => AdapterOutcome::Cancelled,
                Err(e) => AdapterOutcome::Failed {
                    error: format!("adapter task panicked: {}", e),
                },
            };
            summary.source_mut(&id).outcome = outcome;
        }

        if let Some((adapter, source)) = fatal {
            summary.aborted = Some(source.to_string());
            summary.finished_at = Some(Utc::now());
            self.state = RunState::Done;
            return Err(PipelineError::Fatal {
                adapter,
                source,
                summary: Box::new(summary),
            });
        }

        self.state = RunState::Finalizing;
        let merges = assembler.stats().merges;
        let (entities, edges) = assembler.finalize();
        summary.record_graph(&entities, &edges, merges);
        summary.finished_at = Some(Utc::now());
        summary.log();
        self.state = RunState::Done;

        Ok(PipelineOutput {
            entities,
            edges,
            summary,
        })
    }
}

/// Run one adapter on its own task, mapping its result to an outcome
fn spawn_adapter(
    adapter: Box<dyn SourceAdapter>,
    sink: RecordSink,
    cancel: CancellationToken,
    timeout: Option<Duration>,
) -> JoinHandle<AdapterOutcome> {
    tokio::spawn(async move {
        let id = adapter.id().to_string();
        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, adapter.produce(sink)).await {
                Ok(result) => result,
                Err(_) => {
                    // Stop readers still running on blocking threads
                    cancel.cancel();
                    warn!(adapter = %id, secs = limit.as_secs_f64(), "adapter timed out");
                    return AdapterOutcome::TimedOut {
                        after_secs: limit.as_secs_f64(),
                    };
                }
            },
            None => adapter.produce(sink).await,
        };

        match result {
            Ok(()) => {
                debug!(adapter = %id, "adapter completed");
                AdapterOutcome::Completed
            }
            Err(AdapterError::Cancelled) => AdapterOutcome::Cancelled,
            Err(e) => {
                warn!(adapter = %id, error = %e, "adapter failed");
                AdapterOutcome::Failed { error: e.to_string() }
            }
        }
    })
}
