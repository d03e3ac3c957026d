use anyhow::Context;
use tokio::sync::oneshot;

use crate::{analysis::Progress, db::models::BatchStatus, orchestrator::BatchOrchestrator};

use super::error::ReprocessError;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_warn;

pub type ReprocessReceiver = oneshot::Receiver<Result<BatchStatus, ReprocessError>>;

impl BatchOrchestrator {
    /// Reprocess one batch in the background.
    ///
    /// `on_step` receives progress lines as the work advances; the returned
    /// receiver resolves exactly once with the batch's terminal status or the
    /// error that stopped the workflow.
    pub fn reprocess_one_batch(&self, batch_id: i64, on_step: Progress) -> ReprocessReceiver {
        let (reply_tx, reply_rx) = oneshot::channel();
        let this = self.clone();

        tokio::spawn(async move {
            let result = this.reprocess_single(batch_id, &on_step).await;
            if reply_tx.send(result).is_err() {
                log_warn!("caller stopped waiting for batch {batch_id} reprocessing");
            }
        });

        reply_rx
    }

    async fn reprocess_single(
        &self,
        batch_id: i64,
        progress: &Progress,
    ) -> Result<BatchStatus, ReprocessError> {
        let _lane = self.inner.work_lane.lock().await;
        let store = &self.inner.store;

        if store
            .fetch_batch(batch_id)
            .await
            .with_context(|| format!("failed to load batch {batch_id}"))?
            .is_none()
        {
            return Err(ReprocessError::NotFound(format!("batch {batch_id}")));
        }

        progress.report(format!("Deleting observations for batch {batch_id}"));
        store
            .delete_observations(&[batch_id])
            .await
            .context("failed to delete observations")?;

        progress.report(format!("Resetting batch {batch_id} to pending"));
        let reset = store
            .reset_batch_statuses(&[batch_id])
            .await
            .context("failed to reset batch status")?;
        if reset.is_empty() {
            return Err(ReprocessError::NothingToReprocess);
        }
        self.announce_reset(&reset);

        progress.report(format!("Sending batch {batch_id} for analysis"));
        let status = match self.process_batch(batch_id, progress).await {
            Ok(status) => status,
            Err(err) => {
                let settled = self.settle_after_error(batch_id, &format!("{err:#}")).await;
                progress.report(format!("Batch {batch_id} stopped early; now {settled}"));
                return Err(err.into());
            }
        };
        progress.report(format!("Batch {batch_id} finished as {status}"));
        Ok(status)
    }
}
