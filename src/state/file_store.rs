//! File-backed Conversation Store
//!
//! Persists the whole `ConversationState` document as one JSON file.
//! Every operation reads the document fully and rewrites it fully, with
//! a flush before returning, so the file on disk is always a complete
//! snapshot. Concurrent access from multiple processes is unsupported:
//! last write wins.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::types::ConversationState;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read store at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write store at {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("store at {path} is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Handle to the conversation document on disk. Opened once per process
/// and injected into the message store; the file itself is only touched
/// for the duration of a single load or save.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a handle for the document at `path`, ensuring the parent
    /// directory exists. The file itself is created lazily on first save.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }
        Ok(Self { path })
    }

    /// Read the full document. A missing file yields the empty state.
    pub fn load(&self) -> Result<ConversationState, StoreError> {
        if !self.path.exists() {
            return Ok(ConversationState::default());
        }

        let contents = fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.display().to_string(),
            source,
        })?;

        serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// Rewrite the full document and flush it to disk.
    pub fn save(&self, state: &ConversationState) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state).map_err(|source| StoreError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })?;

        let result: std::io::Result<()> = (|| {
            let mut file = File::create(&self.path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()
        })();
        result.map_err(|source| StoreError::Write {
            path: self.path.display().to_string(),
            source,
        })?;

        debug!(
            messages = state.messages.len(),
            path = %self.path.display(),
            "conversation persisted"
        );
        Ok(())
    }

    /// Delete the document, resetting the conversation.
    pub fn reset(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|source| StoreError::Write {
                path: self.path.display().to_string(),
                source,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, StoredMessage};

    fn temp_store() -> FileStore {
        let path = std::env::temp_dir()
            .join(format!("valet-store-test-{}.json", uuid::Uuid::new_v4()));
        FileStore::open(path).unwrap()
    }

    fn stored(message: Message) -> StoredMessage {
        StoredMessage {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            message,
        }
    }

    #[test]
    fn test_missing_file_loads_empty_state() {
        let store = temp_store();
        let state = store.load().unwrap();
        assert!(state.messages.is_empty());
        assert_eq!(state.summary, "");
    }

    #[test]
    fn test_round_trip_preserves_order_and_summary() {
        let store = temp_store();

        let mut state = ConversationState::default();
        state.messages.push(stored(Message::user("hello")));
        state.messages.push(stored(Message::assistant("hi there")));
        state.messages.push(stored(Message::user("tell me a joke")));
        state.summary = "user greeted the assistant".to_string();

        store.save(&state).unwrap();
        let reloaded = store.load().unwrap();

        assert_eq!(reloaded, state);
        store.reset().unwrap();
    }

    #[test]
    fn test_reset_clears_document() {
        let store = temp_store();
        let mut state = ConversationState::default();
        state.messages.push(stored(Message::user("hello")));
        store.save(&state).unwrap();

        store.reset().unwrap();
        assert!(store.load().unwrap().messages.is_empty());
    }
}
