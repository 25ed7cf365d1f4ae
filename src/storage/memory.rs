use crate::error::StorageError;
use crate::models::{Note, NoteData, NoteId};
use crate::storage::NoteStorage;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct MemoryStorage {
    notes: Arc<DashMap<NoteId, Note>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NoteStorage for MemoryStorage {
    async fn find_all(&self) -> Result<Vec<Note>, StorageError> {
        let mut notes: Vec<Note> = self.notes.iter().map(|entry| entry.value().clone()).collect();
        notes.sort_by_key(|note| note.id);
        Ok(notes)
    }

    async fn find_by_id(&self, id: &NoteId) -> Result<Option<Note>, StorageError> {
        Ok(self.notes.get(id).map(|note| note.clone()))
    }

    async fn create(&self, data: NoteData) -> Result<Note, StorageError> {
        let note = Note::new(NoteId::generate(), data);
        self.notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn update(&self, id: &NoteId, data: NoteData) -> Result<Option<Note>, StorageError> {
        Ok(self.notes.get_mut(id).map(|mut entry| {
            let note = Note::new(*id, data);
            *entry = note.clone();
            note
        }))
    }

    async fn delete(&self, id: &NoteId) -> Result<bool, StorageError> {
        Ok(self.notes.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn absent_id() -> NoteId {
        NoteId::parse("000000000000000000000000").unwrap()
    }

    #[tokio::test]
    async fn test_create_document() -> Result<()> {
        let storage = MemoryStorage::new();
        let created = storage.create(NoteData::new("Test Title", "Test Content")).await?;
        assert_eq!(created.title, "Test Title");
        assert_eq!(created.content, "Test Content");

        let found = storage.find_by_id(&created.id).await?;
        assert_eq!(found, Some(created));
        Ok(())
    }

    #[tokio::test]
    async fn test_find_all_in_creation_order() -> Result<()> {
        let storage = MemoryStorage::new();
        let first = storage.create(NoteData::new("Note 1", "Content 1")).await?;
        let second = storage.create(NoteData::new("Note 2", "Content 2")).await?;

        let notes = storage.find_all().await?;
        assert_eq!(notes, vec![first, second]);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_keeps_id() -> Result<()> {
        let storage = MemoryStorage::new();
        let created = storage.create(NoteData::new("Original", "Original Content")).await?;

        let updated = storage
            .update(&created.id, NoteData::new("Updated", "Updated Content"))
            .await?
            .expect("note exists");
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.title, "Updated");

        // Replacing with identical data still reports the note as present.
        let again = storage
            .update(&created.id, NoteData::new("Updated", "Updated Content"))
            .await?;
        assert_eq!(again, Some(updated));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_nonexistent_note() -> Result<()> {
        let storage = MemoryStorage::new();
        let updated = storage.update(&absent_id(), NoteData::new("Title", "Content")).await?;
        assert!(updated.is_none());
        assert!(storage.find_all().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_document() -> Result<()> {
        let storage = MemoryStorage::new();
        let created = storage.create(NoteData::new("To Delete", "Content")).await?;

        assert!(storage.delete(&created.id).await?);
        assert!(storage.find_by_id(&created.id).await?.is_none());
        assert!(!storage.delete(&created.id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_nonexistent_document() -> Result<()> {
        let storage = MemoryStorage::new();
        assert!(storage.find_by_id(&absent_id()).await?.is_none());
        assert!(!storage.delete(&absent_id()).await?);
        Ok(())
    }
}
