use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Transaction};

use crate::db::{
    connection::Database,
    helpers::{day_key, from_unix_seconds, parse_day_key},
    models::TimelineCard,
};

fn insert_card(tx: &Transaction<'_>, card: &TimelineCard) -> Result<i64> {
    tx.execute(
        "INSERT INTO timeline_cards (
            batch_id,
            day,
            start_ts,
            end_ts,
            title,
            summary,
            category,
            video_summary_path
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            card.batch_id,
            day_key(card.day),
            card.start_time.timestamp(),
            card.end_time.timestamp(),
            card.title,
            card.summary,
            card.category,
            card.video_summary_path,
        ],
    )
    .with_context(|| "failed to insert timeline card")?;
    Ok(tx.last_insert_rowid())
}

impl Database {
    pub async fn insert_timeline_card(&self, card: &TimelineCard) -> Result<i64> {
        let record = card.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let id = insert_card(&tx, &record)?;
            tx.commit()?;
            Ok(id)
        })
        .await
    }

    /// Swap a batch's cards for new ones in one transaction, so readers never
    /// see the batch without cards.
    pub async fn replace_timeline_cards_for_batch(
        &self,
        batch_id: i64,
        cards: &[TimelineCard],
    ) -> Result<Vec<i64>> {
        let cards = cards.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM timeline_cards WHERE batch_id = ?1",
                params![batch_id],
            )?;
            let mut ids = Vec::with_capacity(cards.len());
            for card in &cards {
                ids.push(insert_card(&tx, card)?);
            }
            tx.commit()?;
            Ok(ids)
        })
        .await
    }

    pub async fn get_timeline_cards_for_day(&self, day: NaiveDate) -> Result<Vec<TimelineCard>> {
        let key = day_key(day);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, batch_id, day, start_ts, end_ts, title, summary, category, video_summary_path
                 FROM timeline_cards
                 WHERE day = ?1
                 ORDER BY start_ts ASC, id ASC",
            )?;

            let mut rows = stmt.query(params![key])?;
            let mut cards = Vec::new();
            while let Some(row) = rows.next()? {
                cards.push(TimelineCard {
                    id: row.get(0)?,
                    batch_id: row.get(1)?,
                    day: parse_day_key(&row.get::<_, String>(2)?)?,
                    start_time: from_unix_seconds(row.get(3)?, "start_ts")?,
                    end_time: from_unix_seconds(row.get(4)?, "end_ts")?,
                    title: row.get(5)?,
                    summary: row.get(6)?,
                    category: row.get(7)?,
                    video_summary_path: row.get(8)?,
                });
            }

            Ok(cards)
        })
        .await
    }

    /// Delete every card of `day` and hand back their media artifact paths.
    /// Removing the files is the caller's job.
    pub async fn delete_timeline_cards_for_day(&self, day: NaiveDate) -> Result<Vec<PathBuf>> {
        let key = day_key(day);
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let paths = {
                let mut stmt = tx.prepare(
                    "SELECT video_summary_path FROM timeline_cards
                     WHERE day = ?1 AND video_summary_path IS NOT NULL",
                )?;
                let mut rows = stmt.query(params![key])?;
                let mut paths = Vec::new();
                while let Some(row) = rows.next()? {
                    let path: String = row.get(0)?;
                    paths.push(PathBuf::from(path));
                }
                paths
            };

            tx.execute("DELETE FROM timeline_cards WHERE day = ?1", params![key])?;
            tx.commit()?;
            Ok(paths)
        })
        .await
    }
}
