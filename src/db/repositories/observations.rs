use anyhow::{Context, Result};
use rusqlite::params;

use crate::db::{connection::Database, helpers::from_unix_seconds, models::Observation};

impl Database {
    pub async fn insert_observation(&self, observation: &Observation) -> Result<i64> {
        let record = observation.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO observations (batch_id, start_ts, end_ts, observation, model)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.batch_id,
                    record.start_time.timestamp(),
                    record.end_time.timestamp(),
                    record.observation,
                    record.model,
                ],
            )
            .with_context(|| "failed to insert observation")?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    pub async fn get_observations_for_batch(&self, batch_id: i64) -> Result<Vec<Observation>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, batch_id, start_ts, end_ts, observation, model
                 FROM observations
                 WHERE batch_id = ?1
                 ORDER BY start_ts ASC, id ASC",
            )?;

            let mut rows = stmt.query(params![batch_id])?;
            let mut observations = Vec::new();
            while let Some(row) = rows.next()? {
                observations.push(Observation {
                    id: row.get(0)?,
                    batch_id: row.get(1)?,
                    start_time: from_unix_seconds(row.get(2)?, "start_ts")?,
                    end_time: from_unix_seconds(row.get(3)?, "end_ts")?,
                    observation: row.get(4)?,
                    model: row.get(5)?,
                });
            }

            Ok(observations)
        })
        .await
    }

    /// Returns the number of observations removed.
    pub async fn delete_observations_for_batches(&self, batch_ids: &[i64]) -> Result<usize> {
        let batch_ids = batch_ids.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let mut deleted = 0;
            for batch_id in &batch_ids {
                deleted += tx.execute(
                    "DELETE FROM observations WHERE batch_id = ?1",
                    params![batch_id],
                )?;
            }
            tx.commit()?;
            Ok(deleted)
        })
        .await
    }
}
