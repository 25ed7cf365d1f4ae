use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NoteError {
    #[error("Invalid note id `{0}`: expected 24 hexadecimal characters")]
    InvalidIdentifier(String),

    #[error("Note not found: {0}")]
    NotFound(String),

    #[error("Canonical store error: {0}")]
    CanonicalStore(#[from] StorageError),

    #[error("Search unavailable: {0}")]
    SearchUnavailable(#[source] SearchIndexError),

    #[error("Search requires at least one query term")]
    InvalidQuery,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Error, Debug)]
pub enum SearchIndexError {
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("Index call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Index task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt index document: {0}")]
    Corrupt(String),

    #[error("Index unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value `{value}` for {key}")]
    Invalid { key: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, NoteError>;
