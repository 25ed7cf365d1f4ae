use crate::error::SearchIndexError;
use crate::models::{NoteDocument, NoteId};
use crate::search::SearchIndex;
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tantivy::schema::Value;
use tantivy::{
    collector::TopDocs,
    directory::MmapDirectory,
    doc,
    query::{BooleanQuery, Occur, Query, TermQuery},
    schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING},
    Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, TantivyError, Term,
};
use tantivy::tokenizer::TokenStream;
use tempfile::TempDir;
use tracing::{debug, warn};

/// Tuning knobs for a [`TantivyIndex`].
#[derive(Debug, Clone, Copy)]
pub struct IndexSettings {
    pub writer_heap_bytes: usize,
    pub search_limit: usize,
    pub timeout: Duration,
}

impl Default for IndexSettings {
    fn default() -> Self {
        IndexSettings {
            writer_heap_bytes: 50_000_000,
            search_limit: 10,
            timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct NoteFields {
    id: Field,
    title: Field,
    content: Field,
}

/// Note index backed by Tantivy.
///
/// Writes are committed immediately, but searches go through a reader that
/// reloads shortly after each commit, so fresh writes become visible with a
/// small delay. Blocking Tantivy work runs on the blocking thread pool and is
/// bounded by the configured timeout.
#[derive(Clone)]
pub struct TantivyIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<Mutex<IndexWriter>>,
    fields: NoteFields,
    settings: IndexSettings,
    _temp_dir: Arc<Option<TempDir>>, // Keep TempDir alive while index is used
}

impl TantivyIndex {
    /// Opens the index stored under `path`, creating it if needed.
    pub fn open(path: impl AsRef<Path>, settings: IndexSettings) -> Result<Self, SearchIndexError> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let directory = MmapDirectory::open(path).map_err(TantivyError::from)?;
        let index = Index::open_or_create(directory, Self::create_schema())?;

        Self::from_index(index, settings, None)
    }

    /// Creates a throwaway index that lives as long as the returned handle.
    pub fn in_temp_dir(settings: IndexSettings) -> Result<Self, SearchIndexError> {
        let dir = TempDir::new()?;
        let index = Index::create_in_dir(dir.path(), Self::create_schema())?;

        Self::from_index(index, settings, Some(dir))
    }

    fn from_index(
        index: Index,
        settings: IndexSettings,
        temp_dir: Option<TempDir>,
    ) -> Result<Self, SearchIndexError> {
        let schema = index.schema();
        let fields = NoteFields {
            id: schema.get_field("id")?,
            title: schema.get_field("title")?,
            content: schema.get_field("content")?,
        };

        let writer = index.writer(settings.writer_heap_bytes)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(Mutex::new(writer)),
            fields,
            settings,
            _temp_dir: Arc::new(temp_dir),
        })
    }

    fn create_schema() -> Schema {
        let mut builder = Schema::builder();

        let text_options = TextOptions::default().set_stored().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("en_stem")
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );

        builder.add_text_field("id", STRING | STORED);
        builder.add_text_field("title", text_options.clone());
        builder.add_text_field("content", text_options);
        builder.build()
    }

    /// Makes every committed write visible to searches right away.
    pub fn refresh(&self) -> Result<(), SearchIndexError> {
        self.reader.reload()?;
        Ok(())
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, IndexWriter>, SearchIndexError> {
        self.writer
            .lock()
            .map_err(|_| SearchIndexError::Unavailable("index writer lock poisoned".to_string()))
    }

    /// Applies staged operations, discarding them if the commit fails so a
    /// half-applied upsert never leaks into a later commit.
    fn commit(writer: &mut IndexWriter) -> Result<(), SearchIndexError> {
        if let Err(err) = writer.commit() {
            if let Err(rollback_err) = writer.rollback() {
                warn!(error = %rollback_err, "failed to roll back index writer");
            }
            return Err(err.into());
        }
        Ok(())
    }

    fn upsert_blocking(&self, document: &NoteDocument) -> Result<(), SearchIndexError> {
        let id = document.id.to_string();
        let mut writer = self.lock_writer()?;

        writer.delete_term(Term::from_field_text(self.fields.id, &id));
        let added = writer.add_document(doc!(
            self.fields.id => id,
            self.fields.title => document.title.clone(),
            self.fields.content => document.content.clone(),
        ));
        if let Err(err) = added {
            if let Err(rollback_err) = writer.rollback() {
                warn!(error = %rollback_err, "failed to roll back index writer");
            }
            return Err(err.into());
        }

        Self::commit(&mut writer)
    }

    fn remove_blocking(&self, id: &NoteId) -> Result<(), SearchIndexError> {
        let mut writer = self.lock_writer()?;
        writer.delete_term(Term::from_field_text(self.fields.id, &id.to_string()));
        Self::commit(&mut writer)
    }

    /// Treats the query as plain words: any note whose title or content
    /// shares an analyzed term with it matches. No query syntax is parsed,
    /// so punctuation in user input can never make the search fail.
    fn search_blocking(&self, query: &str) -> Result<Vec<NoteDocument>, SearchIndexError> {
        let mut terms = Vec::new();
        for field in [self.fields.title, self.fields.content] {
            let mut analyzer = self.index.tokenizer_for_field(field)?;
            let mut tokens = analyzer.token_stream(query);
            while tokens.advance() {
                terms.push(Term::from_field_text(field, &tokens.token().text));
            }
        }
        terms.sort();
        terms.dedup();
        if terms.is_empty() {
            debug!(query, "query has no searchable terms");
            return Ok(Vec::new());
        }

        let clauses: Vec<(Occur, Box<dyn Query>)> = terms
            .into_iter()
            .map(|term| {
                let query: Box<dyn Query> =
                    Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
                (Occur::Should, query)
            })
            .collect();
        let query = BooleanQuery::new(clauses);

        let searcher = self.reader.searcher();
        let limit = self.settings.search_limit.max(1);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;

        top_docs
            .into_iter()
            .map(|(_score, address)| {
                let doc: TantivyDocument = searcher.doc(address)?;
                self.to_note_document(&doc)
            })
            .collect()
    }

    fn to_note_document(&self, doc: &TantivyDocument) -> Result<NoteDocument, SearchIndexError> {
        let text = |field: Field| {
            doc.get_first(field)
                .and_then(|value| value.as_str())
                .map(str::to_string)
        };

        let raw_id = text(self.fields.id)
            .ok_or_else(|| SearchIndexError::Corrupt("document without id".to_string()))?;
        let id = NoteId::parse(&raw_id)
            .map_err(|err| SearchIndexError::Corrupt(err.to_string()))?;

        Ok(NoteDocument {
            id,
            title: text(self.fields.title).unwrap_or_default(),
            content: text(self.fields.content).unwrap_or_default(),
        })
    }

    /// Runs `task` on the blocking pool. A timed-out task keeps running in
    /// the background; its write may still land later.
    async fn run_blocking<T, F>(&self, task: F) -> Result<T, SearchIndexError>
    where
        F: FnOnce(TantivyIndex) -> Result<T, SearchIndexError> + Send + 'static,
        T: Send + 'static,
    {
        let this = self.clone();
        let handle = tokio::task::spawn_blocking(move || task(this));

        match tokio::time::timeout(self.settings.timeout, handle).await {
            Ok(joined) => joined?,
            Err(_) => Err(SearchIndexError::Timeout(self.settings.timeout)),
        }
    }
}

#[async_trait]
impl SearchIndex for TantivyIndex {
    async fn index(&self, document: &NoteDocument) -> Result<(), SearchIndexError> {
        debug!(id = %document.id, "indexing note");
        let document = document.clone();
        self.run_blocking(move |index| index.upsert_blocking(&document))
            .await
    }

    async fn remove(&self, id: &NoteId) -> Result<(), SearchIndexError> {
        debug!(id = %id, "removing note from index");
        let id = *id;
        self.run_blocking(move |index| index.remove_blocking(&id)).await
    }

    async fn search(&self, query: &str) -> Result<Vec<NoteDocument>, SearchIndexError> {
        let query = query.to_string();
        let results = self
            .run_blocking(move |index| index.search_blocking(&query))
            .await?;
        debug!(hits = results.len(), "searched notes");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    fn doc(title: &str, content: &str) -> NoteDocument {
        NoteDocument {
            id: NoteId::generate(),
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_index_and_search() -> Result<()> {
        let index = TantivyIndex::in_temp_dir(IndexSettings::default())?;

        let rust = doc("Rust Programming", "Learn Rust programming language");
        let python = doc("Python Guide", "Python programming tutorial");
        index.index(&rust).await?;
        index.index(&python).await?;
        index.refresh()?;

        assert_eq!(index.search("rust").await?, vec![rust]);
        assert_eq!(index.search("python").await?, vec![python]);
        assert_eq!(index.search("programming").await?.len(), 2);
        assert!(
            index.search("javascript").await?.is_empty(),
            "Should not find documents containing 'javascript'"
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_overwrites_whole_document() -> Result<()> {
        let index = TantivyIndex::in_temp_dir(IndexSettings::default())?;

        let original = doc("Kotlin Guide", "Learn Kotlin");
        index.index(&original).await?;

        let revised = NoteDocument {
            title: "Scala Notes".to_string(),
            content: "Learn Scala".to_string(),
            ..original.clone()
        };
        index.index(&revised).await?;
        index.refresh()?;

        assert!(index.search("kotlin").await?.is_empty());
        assert_eq!(index.search("scala").await?, vec![revised]);

        Ok(())
    }

    #[tokio::test]
    async fn test_remove_document() -> Result<()> {
        let index = TantivyIndex::in_temp_dir(IndexSettings::default())?;

        let document = doc("Test Document", "This is a test document");
        index.index(&document).await?;
        index.refresh()?;
        assert_eq!(index.search("test").await?.len(), 1);

        index.remove(&document.id).await?;
        index.refresh()?;
        assert!(index.search("test").await?.is_empty());

        // Removing an id the index never held is fine.
        index.remove(&NoteId::generate()).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_punctuation_is_plain_text() -> Result<()> {
        let index = TantivyIndex::in_temp_dir(IndexSettings::default())?;
        let document = doc("Kotlin: Guide", "Learn (Kotlin");
        index.index(&document).await?;
        index.index(&doc("Java Guide", "Learn Java")).await?;
        index.refresh()?;

        for query in ["Kotlin: Guide", "Learn (Kotlin", "\"Kotlin", "title:kotlin"] {
            let results = index.search(query).await?;
            assert_eq!(results.first(), Some(&document), "query {query:?}");
        }
        assert!(index.search("nosuchfield:scala").await?.is_empty());
        assert!(index.search("(:)").await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_search_limit() -> Result<()> {
        let settings = IndexSettings {
            search_limit: 2,
            ..Default::default()
        };
        let index = TantivyIndex::in_temp_dir(settings)?;
        for n in 0..5 {
            index.index(&doc(&format!("Guide {n}"), "shared body")).await?;
        }
        index.refresh()?;

        assert_eq!(index.search("guide").await?.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_reopen_persisted_index() -> Result<()> {
        let dir = tempdir()?;
        let document = doc("Persistent Note", "survives reopening");

        {
            let index = TantivyIndex::open(dir.path(), IndexSettings::default())?;
            index.index(&document).await?;
        }

        let reopened = TantivyIndex::open(dir.path(), IndexSettings::default())?;
        assert_eq!(reopened.search("persistent").await?, vec![document]);

        Ok(())
    }
}
