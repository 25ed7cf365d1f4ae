pub mod api;
pub mod config;
pub mod entities;
pub mod error;
mod models;
pub mod notifications;
pub mod search;
pub mod storage;

pub use api::NotesApi;
pub use error::{NoteError, Result};
pub use models::{
    IndexOperation, IndexSyncFailure, Note, NoteData, NoteDocument, NoteEvent, NoteId,
};

use error::SearchIndexError;
use notifications::NotificationHub;
use search::SearchIndex;
use serde::Serialize;
use storage::NoteStorage;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, error, info};

/// Outcome of [`NoteService::reindex_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    pub indexed: usize,
    pub failed: usize,
}

/// Keeps the search index in step with the canonical store.
///
/// The canonical store is authoritative. Every mutation goes to it first and
/// only then, if it took effect, to the index. Index writes are best-effort:
/// a failure is logged and published as [`NoteEvent::IndexSyncFailed`] but
/// never fails or rolls back the canonical operation, and is never retried.
pub struct NoteService<S: NoteStorage, I: SearchIndex> {
    storage: S,
    index: I,
    notifications: NotificationHub,
}

impl<S: NoteStorage, I: SearchIndex> NoteService<S, I> {
    pub fn new(storage: S, index: I) -> Self {
        Self {
            storage,
            index,
            notifications: NotificationHub::default(),
        }
    }

    pub fn subscribe(&self) -> BroadcastStream<NoteEvent> {
        self.notifications.subscribe()
    }

    pub async fn find_all(&self) -> Result<Vec<Note>> {
        Ok(self.storage.find_all().await?)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Note>> {
        let id = NoteId::parse(id)?;
        Ok(self.storage.find_by_id(&id).await?)
    }

    pub async fn create(&self, data: NoteData) -> Result<Note> {
        let note = self.storage.create(data).await?;
        debug!(id = %note.id, "stored note");

        self.sync_index(&note).await;
        self.notifications.publish(NoteEvent::Created(note.clone()));

        Ok(note)
    }

    pub async fn update(&self, id: &str, data: NoteData) -> Result<Option<Note>> {
        let id = NoteId::parse(id)?;
        let Some(note) = self.storage.update(&id, data).await? else {
            return Ok(None);
        };
        debug!(id = %note.id, "replaced note");

        self.sync_index(&note).await;
        self.notifications.publish(NoteEvent::Updated(note.clone()));

        Ok(Some(note))
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let id = NoteId::parse(id)?;
        if !self.storage.delete(&id).await? {
            return Ok(false);
        }
        debug!(id = %id, "deleted note");

        if let Err(err) = self.index.remove(&id).await {
            self.record_failure(id, IndexOperation::Remove, &err);
        }
        self.notifications.publish(NoteEvent::Deleted(id));

        Ok(true)
    }

    /// Full-text search over the index. Results may trail recent writes.
    pub async fn search(&self, query: &str) -> Result<Vec<NoteDocument>> {
        if query.trim().is_empty() {
            return Err(NoteError::InvalidQuery);
        }

        let results = self
            .index
            .search(query)
            .await
            .map_err(NoteError::SearchUnavailable)?;
        debug!(hits = results.len(), "searched index");

        Ok(results)
    }

    /// Replays every canonical note into the index.
    ///
    /// Repairs drift left behind by failed best-effort writes. Documents for
    /// notes that no longer exist canonically are not removed.
    pub async fn reindex_all(&self) -> Result<ReindexReport> {
        let notes = self.storage.find_all().await?;
        let mut report = ReindexReport::default();

        for note in &notes {
            if self.sync_index(note).await {
                report.indexed += 1;
            } else {
                report.failed += 1;
            }
        }

        info!(indexed = report.indexed, failed = report.failed, "reindexed notes");
        Ok(report)
    }

    async fn sync_index(&self, note: &Note) -> bool {
        match self.index.index(&NoteDocument::from(note)).await {
            Ok(()) => true,
            Err(err) => {
                self.record_failure(note.id, IndexOperation::Index, &err);
                false
            }
        }
    }

    fn record_failure(&self, id: NoteId, operation: IndexOperation, err: &SearchIndexError) {
        error!(id = %id, %operation, error = %err, "failed to sync note with search index");
        self.notifications
            .publish(NoteEvent::IndexSyncFailed(IndexSyncFailure {
                id,
                operation,
                reason: err.to_string(),
            }));
    }
}
