use chrono::{DateTime, Utc};

use crate::batching::config::BatchingConfig;
use crate::db::models::Capture;

/// A contiguous run of captures produced by the formation pass. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureBatch {
    captures: Vec<Capture>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

impl CaptureBatch {
    fn starting_with(capture: &Capture) -> Self {
        Self {
            captures: vec![capture.clone()],
            start_time: capture.captured_at,
            end_time: capture.captured_at,
        }
    }

    /// Captures arrive in chronological order.
    fn push(&mut self, capture: &Capture) {
        self.end_time = capture.captured_at;
        self.captures.push(capture.clone());
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    pub fn duration_secs(&self) -> i64 {
        (self.end_time() - self.start_time()).num_seconds()
    }

    pub fn captures(&self) -> &[Capture] {
        &self.captures
    }

    pub fn capture_ids(&self) -> Vec<i64> {
        self.captures.iter().map(|capture| capture.id).collect()
    }

    pub fn len(&self) -> usize {
        self.captures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }
}

/// Greedy single pass over chronologically sorted captures.
///
/// A new bucket starts whenever the gap to the previous capture exceeds
/// `max_gap_secs` or the bucket would span more than `target_duration_secs`.
/// Every input capture lands in exactly one bucket, including the last one.
pub fn group_captures(captures: &[Capture], config: &BatchingConfig) -> Vec<CaptureBatch> {
    let mut batches = Vec::new();
    let mut current: Option<CaptureBatch> = None;

    for capture in captures {
        let starts_new_bucket = match &current {
            Some(bucket) => {
                let gap = (capture.captured_at - bucket.end_time()).num_seconds();
                let span = (capture.captured_at - bucket.start_time()).num_seconds();
                gap > config.max_gap_secs || span > config.target_duration_secs
            }
            None => true,
        };

        if starts_new_bucket {
            if let Some(finished) = current.take() {
                batches.push(finished);
            }
            current = Some(CaptureBatch::starting_with(capture));
        } else if let Some(bucket) = current.as_mut() {
            bucket.push(capture);
        }
    }

    if let Some(bucket) = current {
        batches.push(bucket);
    }

    batches
}

/// Batches ready for analysis.
///
/// Same as [`group_captures`], except the most recent batch is held back when
/// it spans less than the target duration: it is still accumulating captures
/// and will be formed again on a later tick.
pub fn form_batches(captures: &[Capture], config: &BatchingConfig) -> Vec<CaptureBatch> {
    let mut batches = group_captures(captures, config);

    if batches
        .last()
        .is_some_and(|last| last.duration_secs() < config.target_duration_secs)
    {
        batches.pop();
    }

    batches
}
