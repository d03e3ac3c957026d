use anyhow::{Context, Result};

use crate::{analysis::Progress, db::models::BatchStatus};

use super::{controller::BatchOrchestrator, events::BatchStatusChanged};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

impl BatchOrchestrator {
    /// Drive one batch to a terminal status and return it.
    ///
    /// Empty and too-short batches are classified without calling the
    /// analysis service. An analysis error is recorded on the batch as
    /// `failed` and is not an `Err` here; `Err` means storage itself failed.
    pub async fn process_batch(&self, batch_id: i64, progress: &Progress) -> Result<BatchStatus> {
        let captures = self
            .inner
            .store
            .fetch_captures_for_batch(batch_id)
            .await
            .with_context(|| format!("failed to load captures for batch {batch_id}"))?;

        let (Some(first), Some(last)) = (captures.first(), captures.last()) else {
            log_warn!("batch {batch_id} has no captures");
            self.record_status(batch_id, BatchStatus::FailedEmpty).await?;
            progress.report(format!("Batch {batch_id} has no captures; marked failed_empty"));
            return Ok(BatchStatus::FailedEmpty);
        };

        let span_secs = (last.captured_at - first.captured_at).num_seconds();
        if span_secs < self.inner.config.min_batch_duration_secs {
            self.record_status(batch_id, BatchStatus::SkippedShort).await?;
            progress.report(format!(
                "Batch {batch_id} covers only {span_secs}s (minimum {}s); skipped",
                self.inner.config.min_batch_duration_secs
            ));
            return Ok(BatchStatus::SkippedShort);
        }

        self.record_status(batch_id, BatchStatus::Processing).await?;
        progress.report(format!(
            "Analyzing batch {batch_id}: {} captures over {}m {}s",
            captures.len(),
            span_secs / 60,
            span_secs % 60
        ));

        match self.inner.analyzer.process_batch(batch_id, progress).await {
            Ok(outcome) => {
                self.record_status(batch_id, BatchStatus::Completed).await?;
                progress.report(format!(
                    "Batch {batch_id} analyzed: {} observations, {} cards",
                    outcome.observations_created, outcome.cards_created
                ));
                Ok(BatchStatus::Completed)
            }
            Err(err) => {
                let reason = format!("{err:#}");
                self.record_failure(batch_id, &reason).await?;
                progress.report(format!("Batch {batch_id} failed: {reason}"));
                Ok(BatchStatus::Failed)
            }
        }
    }

    pub(crate) async fn record_status(&self, batch_id: i64, status: BatchStatus) -> Result<()> {
        self.inner
            .store
            .update_batch_status(batch_id, status)
            .await
            .with_context(|| format!("failed to mark batch {batch_id} {status}"))?;

        log_info!("batch {batch_id} -> {status}");
        self.inner.events.publish(BatchStatusChanged {
            batch_id,
            status,
            reason: None,
        });
        Ok(())
    }

    pub(crate) async fn record_failure(&self, batch_id: i64, reason: &str) -> Result<()> {
        self.inner
            .store
            .mark_batch_failed(batch_id, reason)
            .await
            .with_context(|| format!("failed to mark batch {batch_id} failed"))?;

        log_warn!("batch {batch_id} -> failed: {reason}");
        self.inner.events.publish(BatchStatusChanged {
            batch_id,
            status: BatchStatus::Failed,
            reason: Some(reason.to_string()),
        });
        Ok(())
    }

    /// Fail a batch whose processing was cut short by a storage error, whether
    /// or not it got as far as `processing`.
    pub(crate) async fn record_forced_failure(&self, batch_id: i64, reason: &str) -> Result<()> {
        self.inner
            .store
            .force_batch_failed(batch_id, reason)
            .await
            .with_context(|| format!("failed to force batch {batch_id} failed"))?;

        log_warn!("batch {batch_id} -> failed (forced): {reason}");
        self.inner.events.publish(BatchStatusChanged {
            batch_id,
            status: BatchStatus::Failed,
            reason: Some(reason.to_string()),
        });
        Ok(())
    }

    /// Make sure a batch whose processing errored ends up `failed`, and report
    /// whatever status storage actually holds when that is not possible.
    pub(crate) async fn settle_after_error(&self, batch_id: i64, reason: &str) -> BatchStatus {
        match self.record_forced_failure(batch_id, reason).await {
            Ok(()) => BatchStatus::Failed,
            Err(mark_err) => {
                log_warn!("could not record failure for batch {batch_id}: {mark_err:#}");
                self.stored_status(batch_id)
                    .await
                    .unwrap_or(BatchStatus::Pending)
            }
        }
    }

    /// Status as storage currently has it, for reporting after a failed write.
    async fn stored_status(&self, batch_id: i64) -> Option<BatchStatus> {
        match self.inner.store.fetch_batch(batch_id).await {
            Ok(batch) => batch.map(|batch| batch.status),
            Err(err) => {
                log_warn!("could not read back batch {batch_id}: {err:#}");
                None
            }
        }
    }

    /// Announce batches that a reprocessing workflow forced back to `pending`.
    pub(crate) fn announce_reset(&self, batch_ids: &[i64]) {
        for batch_id in batch_ids {
            self.inner.events.publish(BatchStatusChanged {
                batch_id: *batch_id,
                status: BatchStatus::Pending,
                reason: None,
            });
        }
    }
}
