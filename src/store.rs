//! Storage operations the orchestrator and reprocessing workflows rely on.
//!
//! Implementations must serialize concurrent writers themselves; callers do
//! no locking of their own. [`crate::db::Database`] is the SQLite implementation.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::db::models::{BatchRecord, BatchStatus, Capture};

#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Captures not yet consumed by any batch, captured at or after `since`, oldest first.
    async fn fetch_unprocessed_captures(&self, since: DateTime<Utc>) -> Result<Vec<Capture>>;

    /// Persist a `pending` batch. `None` means nothing was written.
    async fn persist_batch(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        capture_ids: &[i64],
    ) -> Result<Option<i64>>;

    async fn fetch_batch(&self, batch_id: i64) -> Result<Option<BatchRecord>>;

    /// Existing batches among `batch_ids`, in the order given.
    async fn fetch_batches(&self, batch_ids: &[i64]) -> Result<Vec<BatchRecord>>;

    /// Batches starting on `day`, chronologically.
    async fn fetch_batches_for_day(&self, day: NaiveDate) -> Result<Vec<BatchRecord>>;

    async fn fetch_all_batches(&self) -> Result<Vec<BatchRecord>>;

    /// Member captures of a batch, oldest first.
    async fn fetch_captures_for_batch(&self, batch_id: i64) -> Result<Vec<Capture>>;

    async fn delete_observations(&self, batch_ids: &[i64]) -> Result<usize>;

    /// Force batches back to `pending`; returns the ids actually reset.
    async fn reset_batch_statuses(&self, batch_ids: &[i64]) -> Result<Vec<i64>>;

    async fn reset_batch_statuses_for_day(&self, day: NaiveDate) -> Result<Vec<i64>>;

    /// Forward transition; illegal transitions are errors.
    async fn update_batch_status(&self, batch_id: i64, status: BatchStatus) -> Result<()>;

    async fn mark_batch_failed(&self, batch_id: i64, reason: &str) -> Result<()>;

    /// Fail a non-terminal batch regardless of whether it reached `processing`.
    /// Only for cleaning up after storage errors; normal moves use the two above.
    async fn force_batch_failed(&self, batch_id: i64, reason: &str) -> Result<()>;

    /// Batches persisted but not yet dispatched, oldest first.
    async fn fetch_pending_batches(&self) -> Result<Vec<BatchRecord>>;

    /// Delete the day's timeline cards; returns media artifact paths for the caller to remove.
    async fn delete_timeline_records(&self, day: NaiveDate) -> Result<Vec<PathBuf>>;
}
