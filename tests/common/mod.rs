#![allow(dead_code)]

use std::{
    collections::HashSet,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use capture_batcher::{
    AnalysisOutcome, BatchAnalyzer, BatchOrchestrator, BatchRecord, BatchStatus, BatchStore,
    BatchingConfig, CadencePreset, Capture, Database, Observation, OrchestratorConfig, Progress,
    SettingsStore,
};
use chrono::{DateTime, NaiveDate, Utc};
use tempfile::TempDir;

/// Scripted analysis service: writes one observation per call and fails for
/// the batch ids it is told to.
pub struct FakeAnalyzer {
    db: Database,
    calls: Mutex<Vec<i64>>,
    failing: Mutex<HashSet<i64>>,
    fail_all: bool,
    batching: Option<BatchingConfig>,
}

impl FakeAnalyzer {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            fail_all: false,
            batching: None,
        }
    }

    pub fn failing_everything(db: Database) -> Self {
        Self {
            fail_all: true,
            ..Self::new(db)
        }
    }

    pub fn with_batching(db: Database, batching: BatchingConfig) -> Self {
        Self {
            batching: Some(batching),
            ..Self::new(db)
        }
    }

    pub fn fail_batch(&self, batch_id: i64) {
        self.failing.lock().unwrap().insert(batch_id);
    }

    pub fn calls(&self) -> Vec<i64> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BatchAnalyzer for FakeAnalyzer {
    fn batching_config(&self, cadence: CadencePreset) -> BatchingConfig {
        self.batching
            .unwrap_or_else(|| cadence.batching_config())
    }

    async fn process_batch(&self, batch_id: i64, progress: &Progress) -> Result<AnalysisOutcome> {
        self.calls.lock().unwrap().push(batch_id);
        progress.report(format!("fake analysis of batch {batch_id}"));

        let should_fail = self.fail_all || self.failing.lock().unwrap().contains(&batch_id);
        if should_fail {
            return Err(anyhow!("model unavailable"));
        }

        let batch = self
            .db
            .get_batch(batch_id)
            .await?
            .context("batch vanished during analysis")?;
        self.db
            .insert_observation(&Observation {
                id: None,
                batch_id,
                start_time: batch.start_time,
                end_time: batch.end_time,
                observation: format!("worked on batch {batch_id}"),
                model: Some("fake".to_string()),
            })
            .await?;

        Ok(AnalysisOutcome {
            observations_created: 1,
            cards_created: 0,
        })
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub db: Database,
    pub settings: Arc<SettingsStore>,
    pub analyzer: Arc<FakeAnalyzer>,
    pub orchestrator: BatchOrchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(FakeAnalyzer::new)
    }

    pub fn build(make_analyzer: impl FnOnce(Database) -> FakeAnalyzer) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let db = open_database(&dir);
        let settings =
            Arc::new(SettingsStore::new(dir.path().join("settings.json")).expect("settings"));
        let analyzer = Arc::new(make_analyzer(db.clone()));
        let orchestrator = BatchOrchestrator::new(
            Arc::new(db.clone()),
            analyzer.clone(),
            Arc::clone(&settings),
            OrchestratorConfig::default(),
        );

        Self {
            dir,
            db,
            settings,
            analyzer,
            orchestrator,
        }
    }

    /// Seeds captures at `base + offset` seconds and returns their ids.
    pub async fn seed_captures(&self, base: DateTime<Utc>, offsets: &[i64]) -> Vec<i64> {
        seed_captures(&self.db, base, offsets).await
    }

    /// Runs one pass and waits until every batch it created is terminal.
    pub async fn run_pass_to_completion(&self) -> Vec<BatchRecord> {
        let report = self.orchestrator.run_pass().await.expect("pass");
        let mut batches = Vec::new();
        for batch_id in report.batches_created {
            batches.push(wait_until_terminal(&self.db, batch_id).await);
        }
        batches
    }
}

pub fn open_database(dir: &TempDir) -> Database {
    Database::new(dir.path().join("test.sqlite3")).expect("database")
}

/// Recent enough to fall inside the default unprocessed-capture lookback.
pub fn recent_base() -> DateTime<Utc> {
    let base = Utc::now() - chrono::Duration::hours(3);
    DateTime::from_timestamp(base.timestamp(), 0).expect("whole seconds")
}

pub async fn seed_captures(db: &Database, base: DateTime<Utc>, offsets: &[i64]) -> Vec<i64> {
    let mut ids = Vec::with_capacity(offsets.len());
    for offset in offsets {
        let captured_at = base + chrono::Duration::seconds(*offset);
        let id = db
            .insert_capture(captured_at, &format!("/captures/{offset}.jpg"))
            .await
            .expect("insert capture");
        ids.push(id);
    }
    ids
}

/// Offsets `0, step, 2*step, ..` up to and including `until`.
pub fn every(step: i64, until: i64) -> Vec<i64> {
    (0..=until).step_by(step as usize).collect()
}

pub async fn wait_until_terminal(db: &Database, batch_id: i64) -> BatchRecord {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let batch = db
                .get_batch(batch_id)
                .await
                .expect("load batch")
                .expect("batch exists");
            if batch.status.is_terminal() {
                return batch;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("batch reached a terminal status in time")
}

/// `Database` wrapper whose capture lookups fail for chosen batches.
pub struct FlakyStore {
    pub db: Database,
    broken: Mutex<HashSet<i64>>,
}

impl FlakyStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            broken: Mutex::new(HashSet::new()),
        }
    }

    pub fn break_batch(&self, batch_id: i64) {
        self.broken.lock().unwrap().insert(batch_id);
    }
}

#[async_trait]
impl BatchStore for FlakyStore {
    async fn fetch_unprocessed_captures(&self, since: DateTime<Utc>) -> Result<Vec<Capture>> {
        self.db.fetch_unprocessed_captures(since).await
    }

    async fn persist_batch(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        capture_ids: &[i64],
    ) -> Result<Option<i64>> {
        self.db.persist_batch(start, end, capture_ids).await
    }

    async fn fetch_batch(&self, batch_id: i64) -> Result<Option<BatchRecord>> {
        self.db.fetch_batch(batch_id).await
    }

    async fn fetch_batches(&self, batch_ids: &[i64]) -> Result<Vec<BatchRecord>> {
        self.db.fetch_batches(batch_ids).await
    }

    async fn fetch_batches_for_day(&self, day: NaiveDate) -> Result<Vec<BatchRecord>> {
        self.db.fetch_batches_for_day(day).await
    }

    async fn fetch_all_batches(&self) -> Result<Vec<BatchRecord>> {
        self.db.fetch_all_batches().await
    }

    async fn fetch_captures_for_batch(&self, batch_id: i64) -> Result<Vec<Capture>> {
        if self.broken.lock().unwrap().contains(&batch_id) {
            return Err(anyhow!("disk I/O error"));
        }
        self.db.fetch_captures_for_batch(batch_id).await
    }

    async fn delete_observations(&self, batch_ids: &[i64]) -> Result<usize> {
        self.db.delete_observations(batch_ids).await
    }

    async fn reset_batch_statuses(&self, batch_ids: &[i64]) -> Result<Vec<i64>> {
        self.db.reset_batch_statuses(batch_ids).await
    }

    async fn reset_batch_statuses_for_day(&self, day: NaiveDate) -> Result<Vec<i64>> {
        self.db.reset_batch_statuses_for_day(day).await
    }

    async fn update_batch_status(&self, batch_id: i64, status: BatchStatus) -> Result<()> {
        self.db.update_batch_status(batch_id, status).await
    }

    async fn mark_batch_failed(&self, batch_id: i64, reason: &str) -> Result<()> {
        self.db.mark_batch_failed(batch_id, reason).await
    }

    async fn force_batch_failed(&self, batch_id: i64, reason: &str) -> Result<()> {
        BatchStore::force_batch_failed(&self.db, batch_id, reason).await
    }

    async fn fetch_pending_batches(&self) -> Result<Vec<BatchRecord>> {
        self.db.fetch_pending_batches().await
    }

    async fn delete_timeline_records(&self, day: NaiveDate) -> Result<Vec<PathBuf>> {
        self.db.delete_timeline_records(day).await
    }
}

/// Orchestrator over a `FlakyStore`, sharing the harness's temp dir layout.
pub fn flaky_orchestrator(
    dir: &TempDir,
) -> (Arc<FlakyStore>, Arc<FakeAnalyzer>, BatchOrchestrator) {
    let db = open_database(dir);
    let store = Arc::new(FlakyStore::new(db.clone()));
    let analyzer = Arc::new(FakeAnalyzer::new(db));
    let settings =
        Arc::new(SettingsStore::new(dir.path().join("settings.json")).expect("settings"));
    let orchestrator = BatchOrchestrator::new(
        store.clone(),
        analyzer.clone(),
        settings,
        OrchestratorConfig::default(),
    );
    (store, analyzer, orchestrator)
}
