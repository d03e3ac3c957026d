use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    analysis::BatchAnalyzer,
    db::{models::BatchStatus, Database},
    orchestrator::{BatchOrchestrator, OrchestratorConfig, OrchestratorHandle},
    settings::SettingsStore,
    utils::init_logging,
};

const DATABASE_FILE: &str = "capture-batcher.sqlite3";
const SETTINGS_FILE: &str = "settings.json";
const INTERRUPTED_REASON: &str = "interrupted before analysis finished";

/// Everything the command layer needs, wired once at startup.
pub struct AppState {
    pub db: Database,
    pub settings: Arc<SettingsStore>,
    pub orchestrator: BatchOrchestrator,
}

impl AppState {
    pub async fn bootstrap(data_dir: &Path, analyzer: Arc<dyn BatchAnalyzer>) -> Result<Self> {
        Self::bootstrap_with_config(data_dir, analyzer, OrchestratorConfig::default()).await
    }

    pub async fn bootstrap_with_config(
        data_dir: &Path,
        analyzer: Arc<dyn BatchAnalyzer>,
        config: OrchestratorConfig,
    ) -> Result<Self> {
        init_logging();
        info!("capture batcher starting up...");

        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

        let database = Database::new(data_dir.join(DATABASE_FILE))?;

        // Batches a previous run left mid-analysis will never get a result.
        let recovered = recover_interrupted_batches(&database).await?;
        if recovered > 0 {
            warn!("Recovered {recovered} interrupted batches; marked as failed");
        }

        let settings = Arc::new(SettingsStore::new(data_dir.join(SETTINGS_FILE))?);
        let orchestrator = BatchOrchestrator::new(
            Arc::new(database.clone()),
            analyzer,
            Arc::clone(&settings),
            config,
        );

        Ok(Self {
            db: database,
            settings,
            orchestrator,
        })
    }

    pub fn handle(&self) -> OrchestratorHandle {
        self.orchestrator.downgrade()
    }
}

async fn recover_interrupted_batches(db: &Database) -> Result<usize> {
    let stuck = db.get_batches_with_status(BatchStatus::Processing).await?;
    for batch in &stuck {
        db.set_batch_failed(batch.id, INTERRUPTED_REASON)
            .await
            .with_context(|| format!("failed to recover batch {}", batch.id))?;
    }
    Ok(stuck.len())
}
