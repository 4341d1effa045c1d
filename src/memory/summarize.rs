//! Summarizer
//!
//! Condenses a block of evicted messages into the rolling summary via a
//! model call. The prompt is a pure function of message content, so the
//! same block always produces the same request; the wording of the
//! reply is up to the model.

use anyhow::{bail, Result};

use crate::types::{ChatRole, Message, ModelClient, ModelReply};

const SUMMARY_INSTRUCTIONS: &str = "Summarize the following conversation excerpt into a terse \
recap. Keep the facts the assistant would need to continue the conversation: what the user \
asked for, what tools were run and what they returned, and any open requests. Reply with the \
recap only.";

/// Render a block of messages as a role-prefixed transcript.
fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                ChatRole::System => "system",
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
                ChatRole::Tool => "tool",
            };
            let body = match (&m.content, &m.tool_call) {
                (Some(content), _) => content.clone(),
                (None, Some(call)) => format!("[called tool {}]", call.name),
                (None, None) => String::new(),
            };
            format!("{role}: {body}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Summarize `messages` into a single recap string.
///
/// Errors propagate to the caller; the message store keeps the previous
/// summary when this fails, so a flaky model call never blanks it.
pub async fn summarize(client: &dyn ModelClient, messages: &[Message]) -> Result<String> {
    let transcript = render_transcript(messages);
    let request = vec![Message::user(transcript)];

    match client.chat(SUMMARY_INSTRUCTIONS, &request, &[]).await? {
        ModelReply::Text(summary) if !summary.trim().is_empty() => Ok(summary),
        ModelReply::Text(_) => bail!("summarizer returned an empty recap"),
        ModelReply::ToolCall(_) => bail!("summarizer returned a tool call"),
    }
}
