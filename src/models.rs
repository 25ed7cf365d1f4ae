use crate::error::NoteError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

static ID_COUNTER: AtomicU32 = AtomicU32::new(0);
static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();

/// Store-assigned note identifier.
///
/// Twelve bytes laid out like a document-store object id: a big-endian
/// UNIX timestamp in seconds, five random bytes fixed per process and a
/// three byte counter. Ids minted by one process therefore sort in creation
/// order. Always rendered as 24 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NoteId([u8; 12]);

impl NoteId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        let seconds = prefix_seconds(Utc::now().timestamp());
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        let process = PROCESS_UNIQUE.get_or_init(|| {
            let mut random = [0u8; 5];
            random.copy_from_slice(&uuid::Uuid::new_v4().as_bytes()[..5]);
            random
        });
        bytes[4..9].copy_from_slice(process);
        let count = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    pub fn parse(raw: &str) -> Result<Self, NoteError> {
        let invalid = || NoteError::InvalidIdentifier(raw.to_string());
        if raw.len() != 24 || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let mut bytes = [0u8; 12];
        for (slot, pair) in bytes.iter_mut().zip(raw.as_bytes().chunks(2)) {
            let pair = std::str::from_utf8(pair).map_err(|_| invalid())?;
            *slot = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
        }
        Ok(Self(bytes))
    }

    #[cfg(test)]
    fn seconds(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

/// Four bytes of seconds run out in 2106; saturate rather than wrap.
fn prefix_seconds(unix: i64) -> u32 {
    u32::try_from(unix.max(0)).unwrap_or(u32::MAX)
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for NoteId {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NoteId {
    type Error = NoteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NoteId> for String {
    fn from(id: NoteId) -> Self {
        id.to_string()
    }
}

/// Write payload for create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteData {
    pub title: String,
    pub content: String,
}

impl NoteData {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// A note as held by the canonical store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
}

impl Note {
    pub fn new(id: NoteId, data: NoteData) -> Self {
        Self {
            id,
            title: data.title,
            content: data.content,
        }
    }
}

/// Searchable projection of a [`Note`]. May lag behind the canonical record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDocument {
    pub id: NoteId,
    pub title: String,
    pub content: String,
}

impl From<&Note> for NoteDocument {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id,
            title: note.title.clone(),
            content: note.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IndexOperation {
    Index,
    Remove,
}

impl fmt::Display for IndexOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexOperation::Index => f.write_str("index"),
            IndexOperation::Remove => f.write_str("remove"),
        }
    }
}

/// A best-effort index write that failed after its canonical write succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSyncFailure {
    pub id: NoteId,
    pub operation: IndexOperation,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NoteEvent {
    Created(Note),
    Updated(Note),
    Deleted(NoteId),
    IndexSyncFailed(IndexSyncFailure),
}
