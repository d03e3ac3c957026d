use std::collections::HashSet;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, ToSql};

use crate::db::{
    connection::Database,
    helpers::{from_unix_seconds, local_day_bounds, parse_batch_status},
    models::{BatchRecord, BatchStatus},
};

const BATCH_COLUMNS: &str = "id, batch_start_ts, batch_end_ts, status, reason";

fn load_capture_ids(conn: &Connection, batch_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT bc.capture_id
         FROM batch_captures bc
         JOIN captures c ON c.id = bc.capture_id
         WHERE bc.batch_id = ?1
         ORDER BY c.captured_at ASC, c.id ASC",
    )?;
    let mut rows = stmt.query(params![batch_id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(row.get(0)?);
    }
    Ok(ids)
}

fn query_batches(conn: &Connection, sql: &str, args: &[&dyn ToSql]) -> Result<Vec<BatchRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(args)?;

    let mut batches = Vec::new();
    while let Some(row) = rows.next()? {
        let id: i64 = row.get(0)?;
        batches.push(BatchRecord {
            id,
            start_time: from_unix_seconds(row.get(1)?, "batch_start_ts")?,
            end_time: from_unix_seconds(row.get(2)?, "batch_end_ts")?,
            status: parse_batch_status(&row.get::<_, String>(3)?)?,
            reason: row.get(4)?,
            capture_ids: Vec::new(),
        });
    }
    drop(rows);

    for batch in &mut batches {
        batch.capture_ids = load_capture_ids(conn, batch.id)?;
    }

    Ok(batches)
}

fn current_status(conn: &Connection, batch_id: i64) -> Result<BatchStatus> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT status FROM batches WHERE id = ?1",
            params![batch_id],
            |row| row.get(0),
        )
        .optional()?;

    match raw {
        Some(value) => parse_batch_status(&value),
        None => bail!("batch {batch_id} not found"),
    }
}

/// Moves a batch forward, rejecting anything the state machine does not allow.
fn transition(
    conn: &mut Connection,
    batch_id: i64,
    next: BatchStatus,
    reason: Option<String>,
) -> Result<()> {
    let tx = conn.transaction()?;
    let current = current_status(&tx, batch_id)?;
    if !current.can_transition_to(next) {
        bail!("illegal status transition {current} -> {next} for batch {batch_id}");
    }

    tx.execute(
        "UPDATE batches
         SET status = ?1,
             reason = ?2,
             updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
         WHERE id = ?3",
        params![next.as_str(), reason, batch_id],
    )?;
    tx.commit()?;
    Ok(())
}

impl Database {
    /// Persist a batch as `pending` together with its member captures.
    ///
    /// Returns `None` without writing anything if a capture already belongs
    /// to another batch.
    pub async fn insert_batch(
        &self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        capture_ids: &[i64],
    ) -> Result<Option<i64>> {
        let capture_ids = capture_ids.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO batches (batch_start_ts, batch_end_ts, status)
                 VALUES (?1, ?2, ?3)",
                params![
                    start_time.timestamp(),
                    end_time.timestamp(),
                    BatchStatus::Pending.as_str(),
                ],
            )
            .with_context(|| "failed to insert batch")?;
            let batch_id = tx.last_insert_rowid();

            for capture_id in &capture_ids {
                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO batch_captures (batch_id, capture_id) VALUES (?1, ?2)",
                    params![batch_id, capture_id],
                )?;
                if inserted == 0 {
                    // Dropping the transaction rolls the batch row back too.
                    return Ok(None);
                }
            }

            tx.commit().with_context(|| "failed to commit batch")?;
            Ok(Some(batch_id))
        })
        .await
    }

    pub async fn get_batch(&self, batch_id: i64) -> Result<Option<BatchRecord>> {
        self.execute(move |conn| {
            let sql = format!("SELECT {BATCH_COLUMNS} FROM batches WHERE id = ?1");
            Ok(query_batches(conn, &sql, &[&batch_id])?.into_iter().next())
        })
        .await
    }

    /// Batches matching `batch_ids`, in the order given. Unknown ids are skipped.
    pub async fn get_batches(&self, batch_ids: &[i64]) -> Result<Vec<BatchRecord>> {
        let batch_ids = batch_ids.to_vec();
        self.execute(move |conn| {
            let sql = format!("SELECT {BATCH_COLUMNS} FROM batches WHERE id = ?1");
            let mut seen = HashSet::new();
            let mut batches = Vec::new();
            for batch_id in batch_ids {
                if !seen.insert(batch_id) {
                    continue;
                }
                batches.extend(query_batches(conn, &sql, &[&batch_id])?);
            }
            Ok(batches)
        })
        .await
    }

    /// Batches whose start falls on `day` (local calendar), chronologically.
    pub async fn get_batches_for_day(&self, day: NaiveDate) -> Result<Vec<BatchRecord>> {
        let (start, end) = local_day_bounds(day)?;
        self.execute(move |conn| {
            let sql = format!(
                "SELECT {BATCH_COLUMNS} FROM batches
                 WHERE batch_start_ts >= ?1 AND batch_start_ts < ?2
                 ORDER BY batch_start_ts ASC, id ASC"
            );
            query_batches(conn, &sql, &[&start.timestamp(), &end.timestamp()])
        })
        .await
    }

    pub async fn get_all_batches(&self) -> Result<Vec<BatchRecord>> {
        self.execute(|conn| {
            let sql = format!("SELECT {BATCH_COLUMNS} FROM batches ORDER BY batch_start_ts ASC, id ASC");
            query_batches(conn, &sql, &[])
        })
        .await
    }

    pub async fn get_batches_with_status(&self, status: BatchStatus) -> Result<Vec<BatchRecord>> {
        self.execute(move |conn| {
            let sql = format!(
                "SELECT {BATCH_COLUMNS} FROM batches
                 WHERE status = ?1
                 ORDER BY batch_start_ts ASC, id ASC"
            );
            query_batches(conn, &sql, &[&status.as_str()])
        })
        .await
    }

    pub async fn set_batch_status(&self, batch_id: i64, status: BatchStatus) -> Result<()> {
        if status == BatchStatus::Failed {
            return Err(anyhow!("use set_batch_failed to record a failure reason"));
        }
        self.execute(move |conn| transition(conn, batch_id, status, None))
            .await
    }

    pub async fn set_batch_failed(&self, batch_id: i64, reason: &str) -> Result<()> {
        let reason = reason.to_string();
        self.execute(move |conn| transition(conn, batch_id, BatchStatus::Failed, Some(reason)))
            .await
    }

    /// Record a failure for a batch that may never have reached `processing`.
    /// Terminal batches are left untouched and reported as an error.
    pub async fn force_batch_failed(&self, batch_id: i64, reason: &str) -> Result<()> {
        let reason = reason.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let current = current_status(&tx, batch_id)?;
            if current.is_terminal() {
                bail!("batch {batch_id} is already {current}");
            }
            tx.execute(
                "UPDATE batches
                 SET status = ?1,
                     reason = ?2,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
                 WHERE id = ?3",
                params![BatchStatus::Failed.as_str(), reason, batch_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Force the given batches back to `pending`. Returns the ids that existed
    /// and were reset, in the order given.
    pub async fn reset_batches(&self, batch_ids: &[i64]) -> Result<Vec<i64>> {
        let batch_ids = batch_ids.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let mut seen = HashSet::new();
            let mut reset = Vec::new();
            for batch_id in batch_ids {
                if !seen.insert(batch_id) {
                    continue;
                }
                let changed = tx.execute(
                    "UPDATE batches
                     SET status = 'pending',
                         reason = NULL,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
                     WHERE id = ?1",
                    params![batch_id],
                )?;
                if changed > 0 {
                    reset.push(batch_id);
                }
            }
            tx.commit()?;
            Ok(reset)
        })
        .await
    }

    /// Force every batch of `day` back to `pending`, returning their ids chronologically.
    pub async fn reset_batches_for_day(&self, day: NaiveDate) -> Result<Vec<i64>> {
        let (start, end) = local_day_bounds(day)?;
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let ids = {
                let mut stmt = tx.prepare(
                    "SELECT id FROM batches
                     WHERE batch_start_ts >= ?1 AND batch_start_ts < ?2
                     ORDER BY batch_start_ts ASC, id ASC",
                )?;
                let mut rows = stmt.query(params![start.timestamp(), end.timestamp()])?;
                let mut ids: Vec<i64> = Vec::new();
                while let Some(row) = rows.next()? {
                    ids.push(row.get(0)?);
                }
                ids
            };

            tx.execute(
                "UPDATE batches
                 SET status = 'pending',
                     reason = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
                 WHERE batch_start_ts >= ?1 AND batch_start_ts < ?2",
                params![start.timestamp(), end.timestamp()],
            )?;
            tx.commit()?;
            Ok(ids)
        })
        .await
    }
}
