//! In-memory adapter over a fixed list of records

use super::sink::{AdapterError, RecordSink};
use super::traits::SourceAdapter;
use super::types::RawRecord;
use async_trait::async_trait;

/// Emits a prepared list of records in order
#[derive(Debug, Clone)]
pub struct MemoryAdapter {
    id: String,
    records: Vec<RawRecord>,
}

impl MemoryAdapter {
    pub fn new(id: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self {
            id: id.into(),
            records,
        }
    }
}

#[async_trait]
impl SourceAdapter for MemoryAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn produce(self: Box<Self>, sink: RecordSink) -> Result<(), AdapterError> {
        let MemoryAdapter { id, records } = *self;
        for mut record in records {
            if record.source_name.is_empty() {
                record.source_name = id.clone();
            }
            sink.emit(record).await?;
        }
        Ok(())
    }
}
