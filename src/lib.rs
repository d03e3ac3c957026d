pub mod analysis;
pub mod app;
pub mod batching;
pub mod cadence;
pub mod commands;
pub mod db;
pub mod orchestrator;
pub mod reprocess;
pub mod settings;
pub mod store;
pub mod utils;

pub use analysis::{AnalysisOutcome, BatchAnalyzer, Progress};
pub use app::AppState;
pub use batching::{form_batches, BatchingConfig, CaptureBatch};
pub use cadence::CadencePreset;
pub use db::{BatchRecord, BatchStatus, Capture, Database, Observation, TimelineCard};
pub use orchestrator::{
    BatchOrchestrator, BatchStatusChanged, OrchestratorConfig, OrchestratorHandle, PassReport,
};
pub use reprocess::{BatchRun, ReprocessError, ReprocessSummary};
pub use settings::SettingsStore;
pub use store::BatchStore;
