//! SourceAdapter trait: the contract every data source implements
//!
//! An adapter turns one source's raw input into `RawRecord`s and pushes
//! them through a sink. Each adapter runs once: `produce` consumes it.

use super::sink::{AdapterError, RecordSink};
use async_trait::async_trait;

/// A finite, one-pass producer of raw records.
#[async_trait]
pub trait SourceAdapter: Send {
    /// Unique identifier for this adapter; used as the default source name
    fn id(&self) -> &str;

    /// Emit every record through the sink.
    ///
    /// Implementations stop with `AdapterError::Cancelled` once the sink
    /// reports cancellation. Records sent before an error are kept.
    async fn produce(self: Box<Self>, sink: RecordSink) -> Result<(), AdapterError>;
}
