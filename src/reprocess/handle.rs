use chrono::NaiveDate;
use tokio::sync::oneshot;

use crate::{
    analysis::Progress,
    orchestrator::{BatchOrchestrator, OrchestratorHandle},
};

use super::{error::ReprocessError, single::ReprocessReceiver, summary::ReprocessSummary};

impl OrchestratorHandle {
    fn require(&self) -> Result<BatchOrchestrator, ReprocessError> {
        self.upgrade().ok_or(ReprocessError::OrchestratorUnavailable)
    }

    /// `false` when the orchestrator is gone or a pass is already running.
    pub fn trigger_now(&self) -> bool {
        self.upgrade()
            .and_then(|orchestrator| orchestrator.trigger_now())
            .is_some()
    }

    pub async fn reprocess_day(
        &self,
        day: NaiveDate,
        progress: &Progress,
    ) -> Result<ReprocessSummary, ReprocessError> {
        self.require()?.reprocess_day(day, progress).await
    }

    pub async fn reprocess_batches(
        &self,
        batch_ids: &[i64],
        progress: &Progress,
    ) -> Result<ReprocessSummary, ReprocessError> {
        self.require()?.reprocess_batches(batch_ids, progress).await
    }

    pub fn reprocess_one_batch(&self, batch_id: i64, on_step: Progress) -> ReprocessReceiver {
        match self.require() {
            Ok(orchestrator) => orchestrator.reprocess_one_batch(batch_id, on_step),
            Err(err) => {
                let (reply_tx, reply_rx) = oneshot::channel();
                let _ = reply_tx.send(Err(err));
                reply_rx
            }
        }
    }
}
