/*!
 * Diagnostic sinks
 *
 * A sink takes one diagnostic record per tick. Delivery is fire-and-forget:
 * sinks never report failures back to the tracker, they log them.
 */

use std::io::{self, Write};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::diagnostics::{DiagnosticRecord, Severity};

/// Receives diagnostic records
pub trait DiagnosticSink: Send + Sync {
    fn publish(&self, record: DiagnosticRecord);
}

/// Emits each record as a tracing event at the record's severity
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl DiagnosticSink for LogSink {
    fn publish(&self, record: DiagnosticRecord) {
        let fields = record
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" | ");

        match record.severity {
            Severity::Ok => info!(target: "bodytrack::diagnostics", "[{}] {}", record.severity, fields),
            Severity::Warn => warn!(
                target: "bodytrack::diagnostics",
                "[{}] {} | {}", record.severity, record.message, fields
            ),
            Severity::Error => error!(
                target: "bodytrack::diagnostics",
                "[{}] {} | {}", record.severity, record.message, fields
            ),
        }
    }
}

/// Writes one JSON object per record (JSON Lines)
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl JsonLinesSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Give back the underlying writer
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_record(&self, record: &DiagnosticRecord) -> crate::error::Result<()> {
        let line = serde_json::to_string(record)?;

        let mut writer = match self.writer.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> DiagnosticSink for JsonLinesSink<W> {
    fn publish(&self, record: DiagnosticRecord) {
        if let Err(e) = self.write_record(&record) {
            warn!("Failed to write diagnostic record: {}", e);
        }
    }
}

/// Forwards records into a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<DiagnosticRecord>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DiagnosticRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl DiagnosticSink for ChannelSink {
    fn publish(&self, record: DiagnosticRecord) {
        if self.tx.send(record).is_err() {
            debug!("Diagnostic receiver dropped, record discarded");
        }
    }
}
