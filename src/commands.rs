//! Entry points for the UI shell. Errors cross this boundary as plain strings.

use crate::{
    analysis::Progress,
    app::AppState,
    cadence::CadencePreset,
    db::{helpers::parse_day_key, models::BatchRecord, models::BatchStatus},
    reprocess::{ReprocessError, ReprocessSummary},
};

fn parse_day(day: &str) -> Result<chrono::NaiveDate, String> {
    parse_day_key(day).map_err(|e| format!("{e:#}"))
}

pub fn get_cadence_preset(state: &AppState) -> Result<CadencePreset, String> {
    Ok(state.settings.cadence_preset())
}

/// Persists the preset. A running orchestrator keeps its current cadence
/// until it is started again.
pub fn set_cadence_preset(state: &AppState, preset: &str) -> Result<CadencePreset, String> {
    let preset =
        CadencePreset::parse(preset).ok_or_else(|| format!("unknown cadence preset '{preset}'"))?;
    state
        .settings
        .set_cadence_preset(preset)
        .map_err(|e| e.to_string())?;
    Ok(preset)
}

/// `false` when a pass was already running and this request was folded into it.
pub fn trigger_processing(state: &AppState) -> Result<bool, String> {
    Ok(state.handle().trigger_now())
}

pub async fn get_batches_for_day(state: &AppState, day: &str) -> Result<Vec<BatchRecord>, String> {
    let day = parse_day(day)?;
    state
        .db
        .get_batches_for_day(day)
        .await
        .map_err(|e| e.to_string())
}

pub async fn reprocess_day(
    state: &AppState,
    day: &str,
    progress: Progress,
) -> Result<ReprocessSummary, String> {
    let day = parse_day(day)?;
    state
        .handle()
        .reprocess_day(day, &progress)
        .await
        .map_err(|e| e.to_string())
}

pub async fn reprocess_batches(
    state: &AppState,
    batch_ids: Vec<i64>,
    progress: Progress,
) -> Result<ReprocessSummary, String> {
    state
        .handle()
        .reprocess_batches(&batch_ids, &progress)
        .await
        .map_err(|e| e.to_string())
}

pub async fn reprocess_one_batch(
    state: &AppState,
    batch_id: i64,
    progress: Progress,
) -> Result<BatchStatus, String> {
    let reply = state.handle().reprocess_one_batch(batch_id, progress);
    match reply.await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(_) => Err(ReprocessError::OrchestratorUnavailable.to_string()),
    }
}
