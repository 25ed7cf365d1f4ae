use crate::error::SearchIndexError;
use crate::models::{NoteDocument, NoteId};
use async_trait::async_trait;

/// Derived, eventually consistent full-text index of notes.
///
/// Failures are always reported as errors. An empty result means no match,
/// never that the index could not be queried.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Upserts the document under its id, replacing any previous version.
    async fn index(&self, document: &NoteDocument) -> Result<(), SearchIndexError>;
    /// Removes the document. Removing an absent id is not an error.
    async fn remove(&self, id: &NoteId) -> Result<(), SearchIndexError>;
    /// Matches `query` across title and content, best match first.
    async fn search(&self, query: &str) -> Result<Vec<NoteDocument>, SearchIndexError>;
}

pub mod memory;
pub mod tantivy_index;

pub use memory::MemoryIndex;
pub use tantivy_index::TantivyIndex;
