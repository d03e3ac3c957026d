//! Timeline card data model.
//!
//! Cards are the user-visible activity records built from observations. They
//! are written by the analysis service; this crate deletes them per day when a
//! day is reprocessed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineCard {
    pub id: Option<i64>,
    pub batch_id: Option<i64>,
    pub day: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub title: String,
    pub summary: Option<String>,
    pub category: Option<String>,
    /// Rendered media artifact on disk, removed together with the card
    pub video_summary_path: Option<String>,
}
