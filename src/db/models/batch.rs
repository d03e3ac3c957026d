//! Batch data models.
//!
//! A batch is the unit of work sent to the analysis service. Its identifier,
//! time bounds and member captures never change after it is persisted; only
//! `status` (and the failure `reason` that goes with it) moves.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Processing,
    Completed,
    Analyzed,
    Failed,
    FailedEmpty,
    SkippedShort,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Analyzed => "analyzed",
            BatchStatus::Failed => "failed",
            BatchStatus::FailedEmpty => "failed_empty",
            BatchStatus::SkippedShort => "skipped_short",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(BatchStatus::Pending),
            "processing" => Some(BatchStatus::Processing),
            "completed" => Some(BatchStatus::Completed),
            "analyzed" => Some(BatchStatus::Analyzed),
            "failed" => Some(BatchStatus::Failed),
            "failed_empty" => Some(BatchStatus::FailedEmpty),
            "skipped_short" => Some(BatchStatus::SkippedShort),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            BatchStatus::Pending | BatchStatus::Processing => false,
            BatchStatus::Completed
            | BatchStatus::Analyzed
            | BatchStatus::Failed
            | BatchStatus::FailedEmpty
            | BatchStatus::SkippedShort => true,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Analyzed)
    }

    /// Forward transitions only. Returning to `pending` is a forced reset and
    /// never goes through this check.
    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        use BatchStatus::*;

        match (self, next) {
            (Pending, Processing | FailedEmpty | SkippedShort) => true,
            (Processing, Completed | Analyzed | Failed) => true,
            (Pending, _) | (Processing, _) => false,
            (Completed | Analyzed | Failed | FailedEmpty | SkippedShort, _) => false,
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BatchStatus,
    pub reason: Option<String>,
    pub capture_ids: Vec<i64>,
}

impl BatchRecord {
    pub fn duration_secs(&self) -> i64 {
        (self.end_time - self.start_time).num_seconds()
    }
}
