use tokio::time::Instant;

use crate::{analysis::Progress, orchestrator::BatchOrchestrator};

use super::summary::{BatchRun, ReprocessSummary};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_error;

impl BatchOrchestrator {
    /// Dispatch batches one at a time, in the order given, awaiting each one's
    /// terminal status before starting the next.
    pub(crate) async fn run_sequentially(
        &self,
        batch_ids: &[i64],
        progress: &Progress,
    ) -> ReprocessSummary {
        let started = Instant::now();
        let total = batch_ids.len();
        let mut runs = Vec::with_capacity(total);

        for (index, batch_id) in batch_ids.iter().copied().enumerate() {
            progress.report(format!(
                "Processing batch {} of {total} (id {batch_id})",
                index + 1
            ));

            let batch_started = Instant::now();
            let status = match self.process_batch(batch_id, progress).await {
                Ok(status) => status,
                Err(err) => {
                    log_error!("reprocessing batch {batch_id} failed: {err:?}");
                    self.settle_after_error(batch_id, &format!("{err:#}")).await
                }
            };
            let elapsed = batch_started.elapsed();

            progress.report(format!(
                "Batch {batch_id} finished as {status} in {:.1}s ({} of {total} done)",
                elapsed.as_secs_f64(),
                index + 1
            ));
            runs.push(BatchRun {
                batch_id,
                status,
                elapsed,
            });
        }

        let summary = ReprocessSummary::new(runs, started.elapsed());
        progress.report(&summary.message);
        summary
    }
}
