use crate::models::NoteEvent;
use futures::StreamExt;
use tokio::sync::broadcast::{self, Sender};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

/// Fan-out of [`NoteEvent`]s to any number of subscribers.
///
/// Publishing never blocks and never fails the caller: with no subscribers
/// the event is simply dropped, and slow subscribers observe a lag error on
/// their stream instead of holding up writers.
#[derive(Clone)]
pub struct NotificationHub {
    sender: Sender<NoteEvent>,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: NoteEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> BroadcastStream<NoteEvent> {
        BroadcastStream::new(self.sender.subscribe())
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Logs every event until the hub is dropped and returns how many were seen.
///
/// A lagging subscriber skips the events it missed and keeps going.
pub async fn log_events(mut stream: BroadcastStream<NoteEvent>) -> usize {
    let mut seen = 0;
    while let Some(item) = stream.next().await {
        let event = match item {
            Ok(event) => event,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "event logger fell behind");
                continue;
            }
        };
        seen += 1;
        match event {
            NoteEvent::Created(note) => info!(id = %note.id, title = %note.title, "note created"),
            NoteEvent::Updated(note) => info!(id = %note.id, title = %note.title, "note updated"),
            NoteEvent::Deleted(id) => info!(id = %id, "note deleted"),
            // Already logged at error level where the failure was recorded.
            NoteEvent::IndexSyncFailed(failure) => debug!(
                id = %failure.id,
                operation = %failure.operation,
                "search document is stale"
            ),
        }
    }
    seen
}
