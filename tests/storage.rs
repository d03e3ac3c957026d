mod common;

use std::path::PathBuf;

use capture_batcher::{db::helpers::local_day_of, BatchStatus, TimelineCard};
use common::{open_database, recent_base, seed_captures};
use tempfile::TempDir;

#[tokio::test]
async fn persisted_batch_consumes_its_captures() {
    let dir = TempDir::new().unwrap();
    let db = open_database(&dir);
    let base = recent_base();
    let ids = seed_captures(&db, base, &[0, 60, 120]).await;

    let since = base - chrono::Duration::hours(1);
    assert_eq!(db.get_unprocessed_captures(since).await.unwrap().len(), 3);

    let batch_id = db
        .insert_batch(base, base + chrono::Duration::seconds(60), &ids[..2])
        .await
        .unwrap()
        .expect("batch created");

    let remaining = db.get_unprocessed_captures(since).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, ids[2]);

    let batch = db.get_batch(batch_id).await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Pending);
    assert_eq!(batch.capture_ids, ids[..2].to_vec());
    assert_eq!(db.get_captures_for_batch(batch_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn unprocessed_captures_respect_the_lookback() {
    let dir = TempDir::new().unwrap();
    let db = open_database(&dir);
    let base = recent_base();
    seed_captures(&db, base, &[0, 600, 1200]).await;

    let since = base + chrono::Duration::seconds(600);
    let captures = db.get_unprocessed_captures(since).await.unwrap();
    let offsets: Vec<i64> = captures
        .iter()
        .map(|capture| (capture.captured_at - base).num_seconds())
        .collect();
    assert_eq!(offsets, vec![600, 1200]);
}

#[tokio::test]
async fn a_capture_cannot_join_two_batches() {
    let dir = TempDir::new().unwrap();
    let db = open_database(&dir);
    let base = recent_base();
    let ids = seed_captures(&db, base, &[0, 60, 120]).await;
    let end = base + chrono::Duration::seconds(120);

    assert!(db.insert_batch(base, end, &ids[..2]).await.unwrap().is_some());
    let conflicting = db.insert_batch(base, end, &ids[1..]).await.unwrap();

    assert_eq!(conflicting, None);
    assert_eq!(db.get_all_batches().await.unwrap().len(), 1);
    // The rolled-back batch must not have claimed the free capture either.
    let since = base - chrono::Duration::hours(1);
    assert_eq!(db.get_unprocessed_captures(since).await.unwrap().len(), 1);
}

#[tokio::test]
async fn status_changes_follow_the_state_machine() {
    let dir = TempDir::new().unwrap();
    let db = open_database(&dir);
    let base = recent_base();
    let ids = seed_captures(&db, base, &[0, 600]).await;
    let batch_id = db
        .insert_batch(base, base + chrono::Duration::seconds(600), &ids)
        .await
        .unwrap()
        .unwrap();

    assert!(db.set_batch_status(batch_id, BatchStatus::Completed).await.is_err());
    assert!(db.set_batch_failed(batch_id, "too early").await.is_err());

    db.set_batch_status(batch_id, BatchStatus::Processing)
        .await
        .unwrap();
    assert!(db.set_batch_status(batch_id, BatchStatus::Failed).await.is_err());
    db.set_batch_failed(batch_id, "model unavailable")
        .await
        .unwrap();

    let batch = db.get_batch(batch_id).await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Failed);
    assert_eq!(batch.reason.as_deref(), Some("model unavailable"));

    assert!(db.set_batch_status(batch_id, BatchStatus::Processing).await.is_err());
    assert!(db.set_batch_status(7_777, BatchStatus::Processing).await.is_err());
}

#[tokio::test]
async fn reset_reports_only_existing_batches_and_clears_reasons() {
    let dir = TempDir::new().unwrap();
    let db = open_database(&dir);
    let base = recent_base();
    let ids = seed_captures(&db, base, &[0, 600]).await;
    let batch_id = db
        .insert_batch(base, base + chrono::Duration::seconds(600), &ids)
        .await
        .unwrap()
        .unwrap();
    db.set_batch_status(batch_id, BatchStatus::Processing)
        .await
        .unwrap();
    db.set_batch_failed(batch_id, "boom").await.unwrap();

    let reset = db.reset_batches(&[9_999, batch_id, batch_id]).await.unwrap();
    assert_eq!(reset, vec![batch_id]);

    let batch = db.get_batch(batch_id).await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Pending);
    assert_eq!(batch.reason, None);
}

#[tokio::test]
async fn batches_are_grouped_by_the_local_day_they_start_on() {
    let dir = TempDir::new().unwrap();
    let db = open_database(&dir);
    let base = recent_base();
    let ids = seed_captures(&db, base, &[0, 600]).await;
    let batch_id = db
        .insert_batch(base, base + chrono::Duration::seconds(600), &ids)
        .await
        .unwrap()
        .unwrap();

    let day = local_day_of(base);
    let batches = db.get_batches_for_day(day).await.unwrap();
    assert_eq!(batches.iter().map(|b| b.id).collect::<Vec<_>>(), vec![batch_id]);

    let other_day = day - chrono::Duration::days(3);
    assert!(db.get_batches_for_day(other_day).await.unwrap().is_empty());
    assert!(db.reset_batches_for_day(other_day).await.unwrap().is_empty());
    assert_eq!(db.reset_batches_for_day(day).await.unwrap(), vec![batch_id]);
}

#[tokio::test]
async fn deleting_a_days_cards_hands_back_their_media_paths() {
    let dir = TempDir::new().unwrap();
    let db = open_database(&dir);
    let base = recent_base();
    let day = local_day_of(base);

    let card = |path: Option<&str>| TimelineCard {
        id: None,
        batch_id: None,
        day,
        start_time: base,
        end_time: base + chrono::Duration::minutes(15),
        title: "Writing".to_string(),
        summary: None,
        category: Some("work".to_string()),
        video_summary_path: path.map(str::to_string),
    };
    db.insert_timeline_card(&card(Some("/tmp/summary-a.mp4")))
        .await
        .unwrap();
    db.insert_timeline_card(&card(None)).await.unwrap();

    let paths = db.delete_timeline_cards_for_day(day).await.unwrap();
    assert_eq!(paths, vec![PathBuf::from("/tmp/summary-a.mp4")]);
    assert!(db.get_timeline_cards_for_day(day).await.unwrap().is_empty());
}

#[tokio::test]
async fn forced_failure_skips_processing_but_never_rewrites_a_terminal_batch() {
    let dir = TempDir::new().unwrap();
    let db = open_database(&dir);
    let base = recent_base();
    let ids = seed_captures(&db, base, &[0, 600]).await;
    let batch_id = db
        .insert_batch(base, base + chrono::Duration::seconds(600), &ids)
        .await
        .unwrap()
        .unwrap();

    db.force_batch_failed(batch_id, "capture lookup failed")
        .await
        .unwrap();
    let batch = db.get_batch(batch_id).await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Failed);
    assert_eq!(batch.reason.as_deref(), Some("capture lookup failed"));

    assert!(db.force_batch_failed(batch_id, "again").await.is_err());
    assert!(db.get_batches_with_status(BatchStatus::Pending).await.unwrap().is_empty());
}
