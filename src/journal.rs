//! Append-only event log shared by the coordinator and node processes
//!
//! Every recorded message is timestamped, kept in memory for the lifetime of
//! the process, and optionally handed to a pluggable [`LogSink`]. The sink
//! contract is strictly best-effort: implementations must not block the
//! caller and must swallow delivery failures.

use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

// ============================================================================
// Log Sink
// ============================================================================

/// Best-effort receiver for journal lines.
///
/// `emit` is called synchronously on the recording path, so implementations
/// that perform I/O must hand the line off to a background task. Failures
/// stay inside the sink; the journal never learns about them.
pub trait LogSink: Send + Sync {
    fn emit(&self, line: &str);
}

// ============================================================================
// Journal
// ============================================================================

/// Append-only, process-lifetime log of timestamped messages.
///
/// Entries are formatted as `[<RFC3339 UTC>] <message>` and never evicted.
pub struct Journal {
    entries: RwLock<Vec<String>>,
    sink: Option<Arc<dyn LogSink>>,
}

impl Journal {
    /// Create a journal with no sink attached
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            sink: None,
        }
    }

    /// Create a journal that forwards every line to the given sink
    pub fn with_sink(sink: Arc<dyn LogSink>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            sink: Some(sink),
        }
    }

    /// Record a message, returning the formatted line
    pub async fn record(&self, message: impl AsRef<str>) -> String {
        let line = format!(
            "[{}] {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            message.as_ref()
        );

        tracing::info!("{}", message.as_ref());

        self.entries.write().await.push(line.clone());

        if let Some(sink) = &self.sink {
            sink.emit(&line);
        }

        line
    }

    /// Full history, in recording order
    pub async fn snapshot(&self) -> Vec<String> {
        self.entries.read().await.clone()
    }

    /// Number of recorded lines
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether anything has been recorded yet
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
