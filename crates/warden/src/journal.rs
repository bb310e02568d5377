//! Journal — append-only JSONL history of diagnosis outcomes.
//!
//! One record per line, written in a single `write_all` under a mutex so
//! concurrent queue workers can never interleave partial lines.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::diagnosis::state::{Command, DiagnosisOutcome};
use crate::evidence::model::FaultKind;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("journal io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("journal encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The durable slice of a diagnosis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: String,
    pub container: String,
    pub fault_type: FaultKind,
    pub command: Command,
    pub reason: String,
    pub action_success: Option<bool>,
}

impl HistoryRecord {
    pub fn from_outcome(outcome: &DiagnosisOutcome) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            container: outcome.container.clone(),
            fault_type: outcome.fault_type,
            command: outcome.command,
            reason: outcome.reason.clone(),
            action_success: outcome.action_success,
        }
    }
}

pub struct Journal {
    path: PathBuf,
    lock: Mutex<()>,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line-atomic write.
    pub async fn append(&self, record: &HistoryRecord) -> Result<(), JournalError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Read every record back, skipping lines that no longer parse.
    pub async fn read_all(&self) -> Result<Vec<HistoryRecord>, JournalError> {
        let _guard = self.lock.lock().await;
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(contents
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect())
    }

    /// Rotate the journal aside (e.g. `history_20250601.jsonl`) after a
    /// daily report. Missing journal is not an error.
    pub async fn archive(&self, suffix: &str) -> Result<Option<PathBuf>, JournalError> {
        let _guard = self.lock.lock().await;
        if !self.path.exists() {
            return Ok(None);
        }
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("history");
        let archived = self.path.with_file_name(format!("{stem}_{suffix}.jsonl"));
        tokio::fs::rename(&self.path, &archived).await?;
        Ok(Some(archived))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(container: &str) -> HistoryRecord {
        HistoryRecord {
            timestamp: "2025-06-01T12:00:00Z".to_string(),
            container: container.to_string(),
            fault_type: FaultKind::CpuHigh,
            command: Command::AlertOnly,
            reason: "test".to_string(),
            action_success: None,
        }
    }

    #[tokio::test]
    async fn append_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path().join("data/history.jsonl"));

        journal.append(&record("a")).await.unwrap();
        journal.append(&record("b")).await.unwrap();

        let records = journal.read_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].container, "a");
        assert_eq!(records[1].container, "b");
    }

    #[tokio::test]
    async fn each_record_is_one_json_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let journal = Journal::new(&path);

        journal.append(&record("x")).await.unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(value["container"], "x");
        assert_eq!(value["fault_type"], "CPU_HIGH");
        assert_eq!(value["command"], "ALERT_ONLY");
    }

    #[tokio::test]
    async fn concurrent_appends_never_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let journal = std::sync::Arc::new(Journal::new(dir.path().join("history.jsonl")));

        let mut handles = Vec::new();
        for i in 0..20 {
            let journal = std::sync::Arc::clone(&journal);
            handles.push(tokio::spawn(async move {
                journal.append(&record(&format!("c{i}"))).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let records = journal.read_all().await.unwrap();
        assert_eq!(records.len(), 20);
    }

    #[tokio::test]
    async fn missing_journal_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path().join("nope.jsonl"));
        assert!(journal.read_all().await.unwrap().is_empty());
        assert!(journal.archive("20250601").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn archive_moves_the_file_aside() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path().join("history.jsonl"));
        journal.append(&record("a")).await.unwrap();

        let archived = journal.archive("20250601").await.unwrap().unwrap();
        assert!(archived.ends_with("history_20250601.jsonl"));
        assert!(archived.exists());
        assert!(journal.read_all().await.unwrap().is_empty());
    }
}
