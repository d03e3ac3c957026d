use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;

use crate::{analysis::Progress, db::helpers::day_key, orchestrator::BatchOrchestrator};

use super::{error::ReprocessError, summary::ReprocessSummary};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

impl BatchOrchestrator {
    /// Rebuild everything derived from one day's batches.
    ///
    /// Deletes the day's timeline cards (and their media files) and the
    /// batches' observations, resets the batches to `pending`, then runs them
    /// one after another in chronological order. Individual batch failures
    /// only show up in the summary. A day without batches is left untouched.
    pub async fn reprocess_day(
        &self,
        day: NaiveDate,
        progress: &Progress,
    ) -> Result<ReprocessSummary, ReprocessError> {
        let _lane = self.inner.work_lane.lock().await;
        let store = &self.inner.store;
        let key = day_key(day);

        progress.report(format!("Looking up batches for {key}"));
        let batches = store
            .fetch_batches_for_day(day)
            .await
            .with_context(|| format!("failed to load batches for {key}"))?;

        if batches.is_empty() {
            let summary = ReprocessSummary::empty(format!("No batches found for {key}; nothing to reprocess"));
            progress.report(&summary.message);
            return Ok(summary);
        }
        progress.report(format!("Found {} batches for {key}", batches.len()));

        let artifacts = store
            .delete_timeline_records(day)
            .await
            .with_context(|| format!("failed to delete timeline cards for {key}"))?;
        let removed_files = remove_artifacts(&artifacts).await;
        progress.report(format!(
            "Deleted timeline cards for {key} and {removed_files} of {} media files",
            artifacts.len()
        ));

        let batch_ids: Vec<i64> = batches.iter().map(|batch| batch.id).collect();
        let deleted = store
            .delete_observations(&batch_ids)
            .await
            .context("failed to delete observations")?;
        progress.report(format!("Deleted {deleted} observations"));

        let reset = store
            .reset_batch_statuses_for_day(day)
            .await
            .with_context(|| format!("failed to reset batches for {key}"))?;
        self.announce_reset(&reset);
        progress.report(format!("Reset {} batches to pending", reset.len()));

        Ok(self.run_sequentially(&reset, progress).await)
    }
}

/// Best effort; returns how many files were actually removed.
async fn remove_artifacts(paths: &[PathBuf]) -> usize {
    let mut removed = 0;
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => removed += 1,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log_info!("media file {} already gone", path.display());
            }
            Err(err) => log_warn!("failed to remove media file {}: {err}", path.display()),
        }
    }
    removed
}
