use std::time::Duration;

use serde::Serialize;

use crate::db::models::BatchStatus;

/// Outcome of one batch inside a sequential reprocessing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRun {
    pub batch_id: i64,
    pub status: BatchStatus,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReprocessSummary {
    pub runs: Vec<BatchRun>,
    pub total: Duration,
    /// Human-readable closing line shown to the user
    pub message: String,
}

impl ReprocessSummary {
    pub fn new(runs: Vec<BatchRun>, total: Duration) -> Self {
        let message = describe(&runs, total);
        Self {
            runs,
            total,
            message,
        }
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            runs: Vec::new(),
            total: Duration::ZERO,
            message: message.into(),
        }
    }

    pub fn average(&self) -> Option<Duration> {
        let count = u32::try_from(self.runs.len()).ok().filter(|count| *count > 0)?;
        Some(self.total / count)
    }

    pub fn succeeded(&self) -> usize {
        self.runs.iter().filter(|run| run.status.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.runs
            .iter()
            .filter(|run| run.status == BatchStatus::Failed)
            .count()
    }

    /// Batches storage still holds in a non-terminal status after their run.
    pub fn unfinished(&self) -> usize {
        self.runs
            .iter()
            .filter(|run| !run.status.is_terminal())
            .count()
    }
}

fn describe(runs: &[BatchRun], total: Duration) -> String {
    if runs.is_empty() {
        return "No batches were reprocessed".to_string();
    }

    let succeeded = runs.iter().filter(|run| run.status.is_success()).count();
    let failed = runs
        .iter()
        .filter(|run| run.status == BatchStatus::Failed)
        .count();
    let unfinished = runs.iter().filter(|run| !run.status.is_terminal()).count();
    let skipped = runs.len() - succeeded - failed - unfinished;
    let average = total.as_secs_f64() / runs.len() as f64;

    let mut message = format!(
        "Reprocessed {} batches in {:.1}s (avg {:.1}s per batch): {} succeeded, {} failed",
        runs.len(),
        total.as_secs_f64(),
        average,
        succeeded,
        failed
    );
    if skipped > 0 {
        message.push_str(&format!(", {skipped} skipped"));
    }
    if unfinished > 0 {
        message.push_str(&format!(", {unfinished} left unfinished"));
    }
    message
}
