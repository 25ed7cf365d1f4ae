use crate::error::SearchIndexError;
use crate::models::{NoteDocument, NoteId};
use crate::search::SearchIndex;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// In-process index with immediate visibility. Terms are lowercase
/// whitespace-separated words; a document matches if any query term appears
/// in its title or content.
#[derive(Clone, Default)]
pub struct MemoryIndex {
    documents: Arc<DashMap<NoteId, NoteDocument>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: &NoteId) -> Option<NoteDocument> {
        self.documents.get(id).map(|doc| doc.clone())
    }
}

fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn index(&self, document: &NoteDocument) -> Result<(), SearchIndexError> {
        self.documents.insert(document.id, document.clone());
        Ok(())
    }

    async fn remove(&self, id: &NoteId) -> Result<(), SearchIndexError> {
        self.documents.remove(id);
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<NoteDocument>, SearchIndexError> {
        let wanted = terms(query);
        let mut results: Vec<(usize, NoteDocument)> = self
            .documents
            .iter()
            .filter_map(|entry| {
                let doc = entry.value();
                let score = terms(&doc.title)
                    .into_iter()
                    .chain(terms(&doc.content))
                    .filter(|term| wanted.contains(term))
                    .count();
                (score > 0).then(|| (score, doc.clone()))
            })
            .collect();

        results.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
        Ok(results.into_iter().map(|(_, doc)| doc).collect())
    }
}
