use crate::error::{NoteError, Result};
use crate::models::{Note, NoteData, NoteDocument};
use crate::search::SearchIndex;
use crate::storage::NoteStorage;
use crate::{NoteService, ReindexReport};
use std::sync::Arc;
use tracing::info;

/// Caller-facing note operations, independent of any transport.
///
/// Absent notes become [`NoteError::NotFound`] here; the service below only
/// reports them as `None`.
pub struct NotesApi<S: NoteStorage, I: SearchIndex> {
    service: Arc<NoteService<S, I>>,
}

impl<S: NoteStorage, I: SearchIndex> Clone for NotesApi<S, I> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl<S: NoteStorage, I: SearchIndex> NotesApi<S, I> {
    pub fn new(service: Arc<NoteService<S, I>>) -> Self {
        Self { service }
    }

    pub async fn list_notes(&self) -> Result<Vec<Note>> {
        info!("Fetching all notes");
        self.service.find_all().await
    }

    pub async fn get_note(&self, id: &str) -> Result<Note> {
        info!(id, "Fetching note");
        self.service
            .find_by_id(id)
            .await?
            .ok_or_else(|| NoteError::NotFound(id.to_string()))
    }

    pub async fn create_note(&self, data: NoteData) -> Result<Note> {
        info!(title = %data.title, "Creating note");
        self.service.create(data).await
    }

    pub async fn update_note(&self, id: &str, data: NoteData) -> Result<Note> {
        info!(id, "Updating note");
        self.service
            .update(id, data)
            .await?
            .ok_or_else(|| NoteError::NotFound(id.to_string()))
    }

    pub async fn delete_note(&self, id: &str) -> Result<bool> {
        info!(id, "Deleting note");
        self.service.delete(id).await
    }

    pub async fn search_notes(&self, query: Option<&str>) -> Result<Vec<NoteDocument>> {
        let query = query.ok_or(NoteError::InvalidQuery)?;
        info!(query, "Searching notes");
        let results = self.service.search(query).await?;
        info!(hits = results.len(), query, "Found notes");
        Ok(results)
    }

    pub async fn reindex(&self) -> Result<ReindexReport> {
        info!("Reindexing all notes");
        self.service.reindex_all().await
    }
}
