use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{connection::Database, helpers::from_unix_seconds, models::Capture};

fn row_to_capture(row: &Row) -> Result<Capture> {
    Ok(Capture {
        id: row.get(0)?,
        captured_at: from_unix_seconds(row.get(1)?, "captured_at")?,
        file_path: row.get(2)?,
    })
}

impl Database {
    pub async fn insert_capture(
        &self,
        captured_at: DateTime<Utc>,
        file_path: &str,
    ) -> Result<i64> {
        let file_path = file_path.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO captures (captured_at, file_path) VALUES (?1, ?2)",
                params![captured_at.timestamp(), file_path],
            )
            .with_context(|| "failed to insert capture")?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Captures at or after `since` that no batch has consumed yet, oldest first.
    pub async fn get_unprocessed_captures(&self, since: DateTime<Utc>) -> Result<Vec<Capture>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.captured_at, c.file_path
                 FROM captures c
                 LEFT JOIN batch_captures bc ON bc.capture_id = c.id
                 WHERE bc.capture_id IS NULL
                   AND c.captured_at >= ?1
                 ORDER BY c.captured_at ASC, c.id ASC",
            )?;

            let mut rows = stmt.query(params![since.timestamp()])?;
            let mut captures = Vec::new();
            while let Some(row) = rows.next()? {
                captures.push(row_to_capture(row)?);
            }

            Ok(captures)
        })
        .await
    }

    pub async fn get_captures_for_batch(&self, batch_id: i64) -> Result<Vec<Capture>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.captured_at, c.file_path
                 FROM batch_captures bc
                 JOIN captures c ON c.id = bc.capture_id
                 WHERE bc.batch_id = ?1
                 ORDER BY c.captured_at ASC, c.id ASC",
            )?;

            let mut rows = stmt.query(params![batch_id])?;
            let mut captures = Vec::new();
            while let Some(row) = rows.next()? {
                captures.push(row_to_capture(row)?);
            }

            Ok(captures)
        })
        .await
    }
}
