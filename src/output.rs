//! Record emission
//!
//! The orchestrator forwards every fetched record through [`RecordSink`],
//! one synchronous call per record in fetch order, with no buffering
//! assumptions. [`MessageWriter`] is the production sink: singer-style
//! SCHEMA/RECORD/STATE messages as JSON lines, one message per line.

use serde_json::{json, Value};
use std::io::Write;

use crate::state::SyncState;

/// Output errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Downstream collaborator receiving the extracted data
pub trait RecordSink {
    /// Announce a stream's schema before its records
    fn write_schema(
        &mut self,
        stream_id: &str,
        schema: &Value,
        key_properties: &[&str],
    ) -> OutputResult<()>;

    /// Forward a single record; called once per record in fetch order
    fn write_record(&mut self, stream_id: &str, record: &Value) -> OutputResult<()>;

    /// Publish the current sync state after a bookmark flush
    fn write_state(&mut self, state: &SyncState) -> OutputResult<()>;
}

/// Singer-style JSON-lines message writer
pub struct MessageWriter<W: Write> {
    writer: W,
}

impl MessageWriter<std::io::Stdout> {
    /// Message writer over stdout, the tap's normal output channel
    pub fn stdout() -> Self {
        Self {
            writer: std::io::stdout(),
        }
    }
}

impl<W: Write> MessageWriter<W> {
    /// Message writer over an arbitrary writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consume the writer, returning the underlying sink
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_message(&mut self, message: &Value) -> OutputResult<()> {
        serde_json::to_writer(&mut self.writer, message)
            .map_err(|e| OutputError::Serialization(e.to_string()))?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| OutputError::Io(e.to_string()))?;
        Ok(())
    }
}

impl<W: Write> RecordSink for MessageWriter<W> {
    fn write_schema(
        &mut self,
        stream_id: &str,
        schema: &Value,
        key_properties: &[&str],
    ) -> OutputResult<()> {
        self.write_message(&json!({
            "type": "SCHEMA",
            "stream": stream_id,
            "schema": schema,
            "key_properties": key_properties,
        }))
    }

    fn write_record(&mut self, stream_id: &str, record: &Value) -> OutputResult<()> {
        self.write_message(&json!({
            "type": "RECORD",
            "stream": stream_id,
            "record": record,
        }))
    }

    fn write_state(&mut self, state: &SyncState) -> OutputResult<()> {
        let value = serde_json::to_value(state)
            .map_err(|e| OutputError::Serialization(e.to_string()))?;
        self.write_message(&json!({
            "type": "STATE",
            "value": value,
        }))
    }
}
