//! Persistence layer: a JSON document store for the conversation.

mod file_store;

pub use file_store::{FileStore, StoreError};
