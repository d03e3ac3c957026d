//! Contract with the external content-analysis service.
//!
//! The service turns one batch into observations and timeline cards. What it
//! does internally is its own business; the orchestrator only needs to know
//! when it finished and whether it succeeded.

use std::{fmt, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use log::info;

use crate::batching::BatchingConfig;
use crate::cadence::CadencePreset;

type ProgressSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Free-text progress reporting for long-running, user-observable work.
///
/// Every line is also written to the log, so a silent reporter still leaves a trail.
#[derive(Clone, Default)]
pub struct Progress {
    sink: Option<ProgressSink>,
}

impl Progress {
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            sink: Some(Arc::new(sink)),
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }

    pub fn report(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        info!("{message}");
        if let Some(sink) = &self.sink {
            sink(message);
        }
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

/// What the service reports back for a successfully analyzed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisOutcome {
    pub observations_created: usize,
    pub cards_created: usize,
}

#[async_trait]
pub trait BatchAnalyzer: Send + Sync {
    /// Batch-shaping parameters to use under the given cadence.
    fn batching_config(&self, cadence: CadencePreset) -> BatchingConfig {
        cadence.batching_config()
    }

    /// Analyze one batch. Resolves exactly once, with the outcome or the error
    /// that made the batch fail.
    async fn process_batch(&self, batch_id: i64, progress: &Progress) -> Result<AnalysisOutcome>;
}
