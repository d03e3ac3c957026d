use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-batch analysis output. Deleted and regenerated whenever its batch is reprocessed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: Option<i64>,
    pub batch_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub observation: String,
    pub model: Option<String>,
}
