use thiserror::Error;

/// Workflow-level failures. Individual batch failures are not errors; they
/// end up in the batch's status and the run summary.
#[derive(Debug, Error)]
pub enum ReprocessError {
    /// The orchestrator was torn down before the request arrived.
    #[error("batch orchestrator is no longer running")]
    OrchestratorUnavailable,

    #[error("no batches found for {0}")]
    NotFound(String),

    #[error("none of the requested batches could be reset for reprocessing")]
    NothingToReprocess,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
