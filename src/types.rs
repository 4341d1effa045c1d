//! Valet - Type Definitions
//!
//! Shared types for the conversational agent runtime: the conversation
//! data model, the model-collaborator boundary, and the tool system.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ─── Conversation Model ──────────────────────────────────────────

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One turn in the conversation, as presented to the model.
///
/// Assistant messages carry either `content` or a single `tool_call`.
/// Tool-role messages carry `tool_call_id` referencing the call they
/// answer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: ChatRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: Some(content.into()),
            tool_call: None,
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: Some(content.into()),
            tool_call: None,
            tool_call_id: None,
        }
    }

    pub fn assistant_tool_call(call: ToolCall) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: None,
            tool_call: Some(call),
            tool_call_id: None,
        }
    }

    pub fn tool_response(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: Some(content.into()),
            tool_call: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// A model-issued request to invoke a named tool.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// A `Message` enriched with storage metadata. Assigned at append time,
/// immutable thereafter. Owned exclusively by the message store; callers
/// only ever see stripped copies.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: String,
    pub created_at: String,
    #[serde(flatten)]
    pub message: Message,
}

impl StoredMessage {
    /// Strip storage metadata, leaving only the model-facing message.
    pub fn strip(&self) -> Message {
        self.message.clone()
    }
}

/// The persisted document: the full append-only log plus the single
/// rolling summary. Rewritten wholesale on every mutation.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    pub messages: Vec<StoredMessage>,
    pub summary: String,
}

// ─── Model Collaborator ──────────────────────────────────────────

/// The model's reply, as a tagged variant. Exactly one of the two shapes
/// comes back per call; the provider is configured against parallel
/// tool calls.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelReply {
    Text(String),
    ToolCall(ToolCall),
}

impl ModelReply {
    /// Convert the reply into the assistant message to append to the log.
    pub fn into_message(self) -> Message {
        match self {
            ModelReply::Text(content) => Message::assistant(content),
            ModelReply::ToolCall(call) => Message::assistant_tool_call(call),
        }
    }
}

/// Declared shape of a tool, as handed to the model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Opaque inference boundary. One implementation talks to an
/// OpenAI-compatible endpoint; tests script their own.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// One chat-completion round trip. `tools` may be empty.
    async fn chat(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> anyhow::Result<ModelReply>;

    /// Structured-output classification of a free-text reply as
    /// approve/deny. Constrained to a single boolean field.
    async fn classify_approval(&self, user_reply: &str) -> anyhow::Result<bool>;
}

// ─── Tool System ─────────────────────────────────────────────────

/// Runtime context handed to every tool invocation.
pub struct ToolContext {
    pub http: reqwest::Client,
    pub config: crate::config::ValetConfig,
}

/// A capability the agent can invoke. Declares its parameter schema up
/// front; `execute` only ever runs with arguments that validated
/// against it.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// JSON Schema (`type: object`) for the arguments.
    fn parameters(&self) -> serde_json::Value;

    /// Whether dispatch must be gated behind explicit human approval.
    fn requires_approval(&self) -> bool {
        false
    }

    async fn execute(
        &self,
        args: &serde_json::Value,
        user_message: &str,
        ctx: &ToolContext,
    ) -> anyhow::Result<String>;
}

// ─── Agent Loop ──────────────────────────────────────────────────

/// Observable loop status, surfaced through the `on_status` callback
/// for display purposes only. The loop never depends on a listener
/// being present.
#[derive(Clone, Debug, PartialEq)]
pub enum AgentStatus {
    Idle,
    AwaitingModel,
    ToolPending { tool: String },
    AwaitingApproval { tool: String },
    Done,
}

/// Terminal result of one user turn.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The model produced user-visible content; the updated window is
    /// returned for display.
    Done(Vec<Message>),
    /// Suspended on a sensitive tool call; the next user turn resolves it.
    AwaitingApproval { tool: String },
    /// The chained-tool cap was hit; the turn ended without a final answer.
    HopLimitReached,
}
