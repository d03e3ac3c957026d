use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::db::{
    connection::Database,
    models::{BatchRecord, BatchStatus, Capture},
};
use crate::store::BatchStore;

#[async_trait]
impl BatchStore for Database {
    async fn fetch_unprocessed_captures(&self, since: DateTime<Utc>) -> Result<Vec<Capture>> {
        self.get_unprocessed_captures(since).await
    }

    async fn persist_batch(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        capture_ids: &[i64],
    ) -> Result<Option<i64>> {
        self.insert_batch(start, end, capture_ids).await
    }

    async fn fetch_batch(&self, batch_id: i64) -> Result<Option<BatchRecord>> {
        self.get_batch(batch_id).await
    }

    async fn fetch_batches(&self, batch_ids: &[i64]) -> Result<Vec<BatchRecord>> {
        self.get_batches(batch_ids).await
    }

    async fn fetch_batches_for_day(&self, day: NaiveDate) -> Result<Vec<BatchRecord>> {
        self.get_batches_for_day(day).await
    }

    async fn fetch_all_batches(&self) -> Result<Vec<BatchRecord>> {
        self.get_all_batches().await
    }

    async fn fetch_captures_for_batch(&self, batch_id: i64) -> Result<Vec<Capture>> {
        self.get_captures_for_batch(batch_id).await
    }

    async fn delete_observations(&self, batch_ids: &[i64]) -> Result<usize> {
        self.delete_observations_for_batches(batch_ids).await
    }

    async fn reset_batch_statuses(&self, batch_ids: &[i64]) -> Result<Vec<i64>> {
        self.reset_batches(batch_ids).await
    }

    async fn reset_batch_statuses_for_day(&self, day: NaiveDate) -> Result<Vec<i64>> {
        self.reset_batches_for_day(day).await
    }

    async fn update_batch_status(&self, batch_id: i64, status: BatchStatus) -> Result<()> {
        self.set_batch_status(batch_id, status).await
    }

    async fn mark_batch_failed(&self, batch_id: i64, reason: &str) -> Result<()> {
        self.set_batch_failed(batch_id, reason).await
    }

    async fn force_batch_failed(&self, batch_id: i64, reason: &str) -> Result<()> {
        Database::force_batch_failed(self, batch_id, reason).await
    }

    async fn fetch_pending_batches(&self) -> Result<Vec<BatchRecord>> {
        self.get_batches_with_status(BatchStatus::Pending).await
    }

    async fn delete_timeline_records(&self, day: NaiveDate) -> Result<Vec<PathBuf>> {
        self.delete_timeline_cards_for_day(day).await
    }
}
