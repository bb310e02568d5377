//! Daily reporter — summarize the journal into a Markdown digest.
//!
//! Runs outside the hot path: reads `data/history.jsonl`, aggregates
//! fault counts, asks the model for a digest, writes
//! `reports/daily_report_<date>.md`, then rotates the journal aside.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::diagnosis::llm::{ChatModel, LlmError};
use crate::journal::{HistoryRecord, Journal};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("journal error: {0}")]
    Journal(#[from] crate::journal::JournalError),
    #[error("report io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("summary generation failed: {0}")]
    Llm(#[from] LlmError),
}

const SUMMARY_PROMPT: &str = "You are an SRE writing the daily operations digest for a \
container fleet supervisor. Summarize overall fleet health, call out the most frequent \
fault types and the noisiest containers, and suggest concrete follow-ups. Reply in \
Markdown.";

pub struct DailyReporter {
    journal: Arc<Journal>,
    chat: Arc<dyn ChatModel>,
    report_dir: PathBuf,
}

impl DailyReporter {
    pub fn new(journal: Arc<Journal>, chat: Arc<dyn ChatModel>, report_dir: impl Into<PathBuf>) -> Self {
        Self {
            journal,
            chat,
            report_dir: report_dir.into(),
        }
    }

    /// Aggregate fault counts across records.
    fn fault_counts(records: &[HistoryRecord]) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in records {
            *counts.entry(record.fault_type.to_string()).or_insert(0) += 1;
        }
        counts
    }

    fn build_user_prompt(records: &[HistoryRecord]) -> String {
        let counts = Self::fault_counts(records);
        let tail: Vec<&HistoryRecord> = records.iter().rev().take(20).rev().collect();
        format!(
            "Total events: {}\nFault distribution: {:?}\n\nMost recent records:\n{}",
            records.len(),
            counts,
            serde_json::to_string_pretty(&tail).unwrap_or_default()
        )
    }

    /// Generate today's report. An empty journal yields `Ok(None)`.
    pub async fn generate_daily_summary(&self) -> Result<Option<PathBuf>, ReportError> {
        let records = self.journal.read_all().await?;
        if records.is_empty() {
            info!("no history records, skipping daily summary");
            return Ok(None);
        }

        let summary = self
            .chat
            .chat(SUMMARY_PROMPT, &Self::build_user_prompt(&records))
            .await?;

        let date = Utc::now().format("%Y%m%d").to_string();
        tokio::fs::create_dir_all(&self.report_dir).await?;
        let report_path = self.report_dir.join(format!("daily_report_{date}.md"));
        let contents = format!("# Warden daily operations report ({date})\n\n{summary}");
        tokio::fs::write(&report_path, contents).await?;

        self.journal.archive(&date).await?;
        info!(path = %report_path.display(), "daily report written");
        Ok(Some(report_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::llm::FakeChat;
    use crate::diagnosis::state::Command;
    use crate::evidence::model::FaultKind;

    fn record(container: &str, fault: FaultKind) -> HistoryRecord {
        HistoryRecord {
            timestamp: "2025-06-01T12:00:00Z".to_string(),
            container: container.to_string(),
            fault_type: fault,
            command: Command::AlertOnly,
            reason: "test".to_string(),
            action_success: None,
        }
    }

    #[test]
    fn fault_counts_aggregate() {
        let records = vec![
            record("a", FaultKind::CpuHigh),
            record("a", FaultKind::CpuHigh),
            record("b", FaultKind::OomKilled),
        ];
        let counts = DailyReporter::fault_counts(&records);
        assert_eq!(counts.get("CPU_HIGH"), Some(&2));
        assert_eq!(counts.get("OOM_KILLED"), Some(&1));
    }

    #[tokio::test]
    async fn empty_journal_skips_the_report() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Arc::new(Journal::new(dir.path().join("history.jsonl")));
        let reporter = DailyReporter::new(
            journal,
            Arc::new(FakeChat::replying("## quiet day")),
            dir.path().join("reports"),
        );
        assert!(reporter.generate_daily_summary().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn report_is_written_and_journal_archived() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Arc::new(Journal::new(dir.path().join("history.jsonl")));
        journal.append(&record("web", FaultKind::CpuHigh)).await.unwrap();

        let reporter = DailyReporter::new(
            Arc::clone(&journal),
            Arc::new(FakeChat::replying("## busy day")),
            dir.path().join("reports"),
        );

        let path = reporter.generate_daily_summary().await.unwrap().unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("busy day"));
        assert!(contents.starts_with("# Warden daily operations report"));

        // journal rotated aside
        assert!(journal.read_all().await.unwrap().is_empty());
    }
}
