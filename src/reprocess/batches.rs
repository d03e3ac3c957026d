use std::collections::HashSet;

use anyhow::Context;

use crate::{analysis::Progress, orchestrator::BatchOrchestrator};

use super::{error::ReprocessError, summary::ReprocessSummary};

fn describe_ids(batch_ids: &[i64]) -> String {
    let ids: Vec<String> = batch_ids.iter().map(i64::to_string).collect();
    format!("ids [{}]", ids.join(", "))
}

impl BatchOrchestrator {
    /// Reprocess an explicit list of batches, in the caller's order.
    ///
    /// Unknown ids are dropped. If none of the ids exist, nothing is touched
    /// and `NotFound` is returned.
    pub async fn reprocess_batches(
        &self,
        batch_ids: &[i64],
        progress: &Progress,
    ) -> Result<ReprocessSummary, ReprocessError> {
        let _lane = self.inner.work_lane.lock().await;
        let store = &self.inner.store;

        let existing = store
            .fetch_batches(batch_ids)
            .await
            .context("failed to load requested batches")?;
        if existing.is_empty() {
            return Err(ReprocessError::NotFound(describe_ids(batch_ids)));
        }

        let existing_ids: Vec<i64> = existing.iter().map(|batch| batch.id).collect();
        let requested: HashSet<i64> = batch_ids.iter().copied().collect();
        if existing_ids.len() < requested.len() {
            let known: HashSet<i64> = existing_ids.iter().copied().collect();
            let mut missing: Vec<i64> = requested.difference(&known).copied().collect();
            missing.sort_unstable();
            progress.report(format!("Skipping unknown batch {}", describe_ids(&missing)));
        }
        progress.report(format!("Reprocessing {} batches", existing_ids.len()));

        let deleted = store
            .delete_observations(&existing_ids)
            .await
            .context("failed to delete observations")?;
        progress.report(format!("Deleted {deleted} observations"));

        let reset: HashSet<i64> = store
            .reset_batch_statuses(&existing_ids)
            .await
            .context("failed to reset batch statuses")?
            .into_iter()
            .collect();
        let eligible: Vec<i64> = existing_ids
            .into_iter()
            .filter(|batch_id| reset.contains(batch_id))
            .collect();
        if eligible.is_empty() {
            return Err(ReprocessError::NothingToReprocess);
        }
        self.announce_reset(&eligible);
        progress.report(format!("Reset {} batches to pending", eligible.len()));

        Ok(self.run_sequentially(&eligible, progress).await)
    }
}
