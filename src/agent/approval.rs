//! Approval Gate
//!
//! A sensitive tool call suspends the loop; the next user turn is run
//! through a one-shot classifier to resolve it. The gate is stateless
//! and sees only the single reply, so a "yes" about something else
//! will be taken at face value -- a known limitation. Any uncertainty
//! or classifier failure resolves to deny: ambiguous input never
//! authorizes a sensitive action.

use tracing::warn;

use crate::tools::ToolRegistry;
use crate::types::{ChatRole, ModelClient, StoredMessage, ToolCall};

/// Derive the pending approval, if any, from the stored log.
///
/// Contract: a pending approval exists precisely when the newest stored
/// message is an assistant message whose single tool call names an
/// approval-gated tool. The loop appends every tool response immediately
/// after its call with nothing interleaved, so an unanswered sensitive
/// call can only ever sit at the end of the log. Nothing is stored for
/// this state; it is recomputed from the log and therefore survives
/// process restarts.
pub fn pending_approval(log: &[StoredMessage], registry: &ToolRegistry) -> Option<ToolCall> {
    let last = log.last()?;
    if last.message.role != ChatRole::Assistant {
        return None;
    }
    let call = last.message.tool_call.as_ref()?;
    if registry.requires_approval(&call.name) {
        Some(call.clone())
    } else {
        None
    }
}

/// Classify a free-text user reply as approve (`true`) or deny
/// (`false`). Classification failure is logged and resolved as deny.
pub async fn check_approval(model: &dyn ModelClient, user_reply: &str) -> bool {
    match model.classify_approval(user_reply).await {
        Ok(approved) => approved,
        Err(err) => {
            warn!(error = %err, "approval classification failed; denying");
            false
        }
    }
}

/// The canned tool response recorded when the user declines.
pub fn denial_response(tool_name: &str) -> String {
    format!("User did not approve running {tool_name} at this time.")
}
