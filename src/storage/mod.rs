use crate::error::StorageError;
use crate::models::{Note, NoteData, NoteId};
use async_trait::async_trait;
use sea_orm::DbErr;
use std::future::Future;
use std::time::Duration;

/// Canonical, authoritative note persistence.
///
/// Implementations never touch the search index. Ids are parsed before they
/// reach the store, so every method takes a well-formed [`NoteId`].
#[async_trait]
pub trait NoteStorage: Send + Sync {
    /// All notes in ascending id order.
    async fn find_all(&self) -> Result<Vec<Note>, StorageError>;
    async fn find_by_id(&self, id: &NoteId) -> Result<Option<Note>, StorageError>;
    /// Persists a new note under a freshly generated id.
    async fn create(&self, data: NoteData) -> Result<Note, StorageError>;
    /// Replaces title and content. `None` when the id does not exist.
    async fn update(&self, id: &NoteId, data: NoteData) -> Result<Option<Note>, StorageError>;
    /// `true` if a note existed and was removed.
    async fn delete(&self, id: &NoteId) -> Result<bool, StorageError>;
}

/// Runs one store call, giving up with [`StorageError::Timeout`] after `timeout`.
pub(crate) async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, DbErr>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(StorageError::Timeout(timeout)),
    }
}

pub mod memory;
pub mod postgres;
