//! Capture data model.
//!
//! A capture is one screenshot written to disk by the recorder. This crate
//! only reads captures and links them to batches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capture {
    pub id: i64,
    pub captured_at: DateTime<Utc>,
    pub file_path: String,
}

impl Capture {
    pub fn unix_seconds(&self) -> i64 {
        self.captured_at.timestamp()
    }
}
