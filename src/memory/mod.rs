//! Conversation Memory
//!
//! The bounded view of an ever-growing conversation: an append-only
//! message log, a sliding window selector, and a rolling summary of
//! evicted turns.

pub mod store;
pub mod summarize;
pub mod window;

pub use store::MessageStore;

/// Total message count at which summarization kicks in.
pub const SUMMARY_THRESHOLD: usize = 10;

/// Number of oldest messages condensed into the rolling summary.
pub const EVICTION_BLOCK: usize = 5;

/// Number of most recent messages presented to the model.
pub const WINDOW_SIZE: usize = 5;
