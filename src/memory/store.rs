//! Message Store
//!
//! Owns the append-only conversation log and the rolling summary.
//! Every operation acquires the underlying file store for its own
//! duration only: load, mutate, persist, return. Appending past the
//! summarization threshold condenses the oldest block before the call
//! returns, which bounds summary staleness at the cost of latency on
//! the write that crosses the line.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::state::FileStore;
use crate::types::{Message, ModelClient, StoredMessage};

use super::summarize::summarize;
use super::window::select_window;
use super::{EVICTION_BLOCK, SUMMARY_THRESHOLD, WINDOW_SIZE};

pub struct MessageStore {
    store: FileStore,
    model: Arc<dyn ModelClient>,
}

impl MessageStore {
    pub fn new(store: FileStore, model: Arc<dyn ModelClient>) -> Self {
        Self { store, model }
    }

    /// Assign metadata to `messages` and append them in order, then
    /// persist. If the log has reached [`SUMMARY_THRESHOLD`], the oldest
    /// [`EVICTION_BLOCK`] messages are condensed into the rolling summary
    /// before this returns. A summarizer failure keeps the previous
    /// summary; the append itself still succeeds.
    pub async fn append(&self, messages: Vec<Message>) -> Result<()> {
        let mut state = self.store.load().context("loading conversation")?;

        for message in messages {
            state.messages.push(StoredMessage {
                id: Uuid::new_v4().to_string(),
                created_at: Utc::now().to_rfc3339(),
                message,
            });
        }

        if state.messages.len() >= SUMMARY_THRESHOLD {
            let block: Vec<Message> = state
                .messages
                .iter()
                .take(EVICTION_BLOCK)
                .map(StoredMessage::strip)
                .collect();

            match summarize(self.model.as_ref(), &block).await {
                Ok(summary) => {
                    info!(messages = state.messages.len(), "rolling summary refreshed");
                    state.summary = summary;
                }
                Err(err) => {
                    // Stale-but-valid beats empty: keep the old summary.
                    warn!(error = %err, "summarization failed; keeping previous summary");
                }
            }
        }

        self.store.save(&state).context("persisting conversation")?;
        Ok(())
    }

    /// Append a tool-role response answering `tool_call_id`.
    pub async fn save_tool_response(&self, tool_call_id: &str, response: &str) -> Result<()> {
        self.append(vec![Message::tool_response(tool_call_id, response)])
            .await
    }

    /// The bounded window handed to the model: the most recent
    /// [`WINDOW_SIZE`] messages, widened backwards while the window would
    /// lead with an unmatched tool response.
    pub fn read_window(&self) -> Result<Vec<Message>> {
        let state = self.store.load().context("loading conversation")?;
        Ok(select_window(&state.messages, WINDOW_SIZE))
    }

    /// The full log with metadata, for pending-approval derivation and
    /// status display. Returned by value; the store keeps ownership of
    /// the canonical records.
    pub fn read_log(&self) -> Result<Vec<StoredMessage>> {
        Ok(self.store.load().context("loading conversation")?.messages)
    }

    /// Current rolling summary. Empty until the threshold is first crossed.
    pub fn summary(&self) -> Result<String> {
        Ok(self.store.load().context("loading conversation")?.summary)
    }
}
