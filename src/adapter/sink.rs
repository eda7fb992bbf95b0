//! RecordSink and adapter error types
//!
//! The sink is the interface through which adapters push records to the
//! pipeline's single writer. Sends are bounded: a slow writer applies
//! backpressure to every adapter.

use super::cancel::CancellationToken;
use super::types::RawRecord;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;

/// One item on the pipeline channel, tagged with the adapter that sent it
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Record { adapter: String, record: RawRecord },
    /// Input the adapter could not turn into a record
    Unparseable { adapter: String, reason: String },
}

impl Envelope {
    pub fn adapter(&self) -> &str {
        match self {
            Self::Record { adapter, .. } | Self::Unparseable { adapter, .. } => adapter,
        }
    }
}

/// Errors from adapter processing (not from individual record rejection).
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("adapter cancelled")]
    Cancelled,
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("adapter error: {0}")]
    Internal(String),
}

/// Channel handle given to one adapter for the duration of its run
#[derive(Debug, Clone)]
pub struct RecordSink {
    adapter: String,
    tx: mpsc::Sender<Envelope>,
    cancel: CancellationToken,
}

impl RecordSink {
    pub fn new(
        adapter: impl Into<String>,
        tx: mpsc::Sender<Envelope>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            adapter: adapter.into(),
            tx,
            cancel,
        }
    }

    pub fn adapter_id(&self) -> &str {
        &self.adapter
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Send one record, waiting for channel capacity.
    ///
    /// Returns `Cancelled` once the run or this adapter has been stopped,
    /// or when the writer has gone away.
    pub async fn emit(&self, record: RawRecord) -> Result<(), AdapterError> {
        self.send(Envelope::Record {
            adapter: self.adapter.clone(),
            record,
        })
        .await
    }

    /// Report input that could not be parsed into a record
    pub async fn report_unparseable(&self, reason: impl Into<String>) -> Result<(), AdapterError> {
        self.send(Envelope::Unparseable {
            adapter: self.adapter.clone(),
            reason: reason.into(),
        })
        .await
    }

    /// Blocking variant of [`emit`](Self::emit) for adapters that read on a
    /// blocking thread. Must not be called from an async context.
    pub fn emit_blocking(&self, record: RawRecord) -> Result<(), AdapterError> {
        self.send_blocking(Envelope::Record {
            adapter: self.adapter.clone(),
            record,
        })
    }

    pub fn report_unparseable_blocking(&self, reason: impl Into<String>) -> Result<(), AdapterError> {
        self.send_blocking(Envelope::Unparseable {
            adapter: self.adapter.clone(),
            reason: reason.into(),
        })
    }

    async fn send(&self, envelope: Envelope) -> Result<(), AdapterError> {
        if self.cancel.is_cancelled() {
            return Err(AdapterError::Cancelled);
        }
        self.tx.send(envelope).await.map_err(|_| AdapterError::Cancelled)
    }

    fn send_blocking(&self, envelope: Envelope) -> Result<(), AdapterError> {
        if self.cancel.is_cancelled() {
            return Err(AdapterError::Cancelled);
        }
        self.tx.blocking_send(envelope).map_err(|_| AdapterError::Cancelled)
    }
}
