//! Destinations for completed session records

use crate::io::append_jsonl;
use crate::types::CompletedSessionRecord;
use std::path::PathBuf;
use std::sync::Mutex;

/// Receives completed sessions. Submission is fire-and-forget: delivery
/// and retry belong to the implementation.
pub trait AnalyticsSink: Send + Sync {
    fn submit(&self, record: CompletedSessionRecord);
}

/// Appends each record as one line of a JSONL file
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl AnalyticsSink for JsonlSink {
    fn submit(&self, record: CompletedSessionRecord) {
        if let Err(err) = append_jsonl(&self.path, &record) {
            tracing::warn!(path = %self.path.display(), %err, "failed to record inbox session");
        }
    }
}

/// Keeps submitted records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<CompletedSessionRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything submitted so far
    pub fn records(&self) -> Vec<CompletedSessionRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AnalyticsSink for MemorySink {
    fn submit(&self, record: CompletedSessionRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(_) => tracing::warn!("memory sink poisoned, dropping session record"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::read_jsonl;
    use chrono::Utc;

    fn record(unread: usize) -> CompletedSessionRecord {
        let now = Utc::now();
        CompletedSessionRecord {
            session_start_time: now,
            session_end_time: now,
            start_total_message_count: 5,
            start_unread_message_count: unread,
            end_total_message_count: 5,
            end_unread_message_count: unread,
            impressions: vec![],
        }
    }

    #[test]
    fn test_jsonl_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlSink::new(dir.path().join("sessions.jsonl"));

        sink.submit(record(1));
        sink.submit(record(2));

        let stored: Vec<CompletedSessionRecord> = read_jsonl(sink.path()).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].start_unread_message_count, 2);
    }

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());
        sink.submit(record(3));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].start_unread_message_count, 3);
    }
}
