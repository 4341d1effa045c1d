//! Window Selector
//!
//! Pure selection of the bounded message window handed to the model.
//! The one invariant: a tool-response message never leads the window
//! without the assistant message that issued its tool call, because the
//! provider rejects a tool message whose call id has no preceding call.

use tracing::warn;

use crate::types::{ChatRole, Message, StoredMessage};

/// Select the trailing window of at most `size` messages, stripped of
/// storage metadata.
///
/// If the selected window would lead with a `tool`-role message, earlier
/// messages are prepended one at a time until the leading message is not
/// a tool response. The loop is bounded by the start of the log; a
/// tool-role message at the very start of the log has no matching call
/// and is an invariant violation, reported loudly in debug builds and
/// degraded to the best-effort window in release.
pub fn select_window(log: &[StoredMessage], size: usize) -> Vec<Message> {
    if log.is_empty() {
        return Vec::new();
    }

    let mut start = log.len().saturating_sub(size);

    // Widen until the window no longer leads with a tool response.
    while start > 0 && log[start].message.role == ChatRole::Tool {
        start -= 1;
    }

    if log[start].message.role == ChatRole::Tool {
        debug_assert!(
            false,
            "conversation log begins with a tool response; no matching tool call exists"
        );
        warn!("window selection found a tool response at the start of the log");
    }

    log[start..].iter().map(StoredMessage::strip).collect()
}
