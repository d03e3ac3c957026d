use serde::Serialize;
use tokio::sync::broadcast;

use crate::db::models::BatchStatus;

/// Published after every batch status write made by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatusChanged {
    pub batch_id: i64,
    pub status: BatchStatus,
    pub reason: Option<String>,
}

#[derive(Clone)]
pub(crate) struct StatusEvents {
    sender: broadcast::Sender<BatchStatusChanged>,
}

impl StatusEvents {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Best effort: nobody listening is fine.
    pub(crate) fn publish(&self, event: BatchStatusChanged) {
        let _ = self.sender.send(event);
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<BatchStatusChanged> {
        self.sender.subscribe()
    }
}
