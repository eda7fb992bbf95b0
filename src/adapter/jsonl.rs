//! JSON-lines adapter: one serialized `RawRecord` per line
//!
//! Used for record dumps produced by external scrapers. Blank lines are
//! skipped; a line that does not parse is reported to the pipeline and
//! counted against this source as a malformed record.

use super::sink::{AdapterError, RecordSink};
use super::traits::SourceAdapter;
use super::types::RawRecord;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct JsonLinesAdapter {
    id: String,
    path: PathBuf,
}

impl JsonLinesAdapter {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }

    fn io_error(&self, source: std::io::Error) -> AdapterError {
        AdapterError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl SourceAdapter for JsonLinesAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn produce(self: Box<Self>, sink: RecordSink) -> Result<(), AdapterError> {
        let file = File::open(&self.path).await.map_err(|e| self.io_error(e))?;
        let mut lines = BufReader::new(file).lines();

        let mut line_number = 0usize;
        let mut emitted = 0usize;
        while let Some(line) = lines.next_line().await.map_err(|e| self.io_error(e))? {
            line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RawRecord>(&line) {
                Ok(mut record) => {
                    if record.source_name.trim().is_empty() {
                        record.source_name = self.id.clone();
                    }
                    sink.emit(record).await?;
                    emitted += 1;
                }
                Err(e) => {
                    sink.report_unparseable(format!("line {}: {}", line_number, e))
                        .await?;
                }
            }
        }

        debug!(adapter = %self.id, path = %self.path.display(), emitted, "finished reading records");
        Ok(())
    }
}
