//! The Agent Loop
//!
//! The top-level state machine for one user turn: resolve any pending
//! approval, append the input, then alternate model calls and tool
//! dispatches until the model produces user-visible content or a
//! sensitive tool suspends the turn.
//!
//! One turn runs to a terminal state before the next is accepted; there
//! is no parallel dispatch and no cancellation of in-flight calls.
//! Concurrent access to one conversation store from multiple processes
//! is unsupported.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::memory::MessageStore;
use crate::tools::ToolRegistry;
use crate::types::{AgentStatus, Message, ModelClient, ModelReply, ToolContext, TurnOutcome};

use super::approval::{check_approval, denial_response, pending_approval};
use super::system_prompt::build_system_prompt;

/// Maximum chained tool dispatches within a single user turn. Hitting
/// the cap terminates the turn with a reported, recoverable outcome.
const MAX_TOOL_HOPS: usize = 10;

type StatusCallback = Box<dyn Fn(AgentStatus) + Send + Sync>;

pub struct Agent {
    store: MessageStore,
    model: Arc<dyn ModelClient>,
    registry: ToolRegistry,
    ctx: ToolContext,
    on_status: Option<StatusCallback>,
}

impl Agent {
    pub fn new(
        store: MessageStore,
        model: Arc<dyn ModelClient>,
        registry: ToolRegistry,
        ctx: ToolContext,
    ) -> Self {
        Self {
            store,
            model,
            registry,
            ctx,
            on_status: None,
        }
    }

    /// Attach a status listener for display purposes. The loop itself
    /// never depends on one being present.
    pub fn with_status_callback(mut self, callback: StatusCallback) -> Self {
        self.on_status = Some(callback);
        self
    }

    fn emit(&self, status: AgentStatus) {
        if let Some(ref cb) = self.on_status {
            cb(status);
        }
    }

    /// Run one user turn to a terminal state.
    pub async fn run_turn(&self, user_message: &str) -> Result<TurnOutcome> {
        self.emit(AgentStatus::Idle);

        // A suspended sensitive tool call claims this input as its
        // approval reply instead of a normal user message.
        let log = self.store.read_log()?;
        if let Some(call) = pending_approval(&log, &self.registry) {
            if check_approval(self.model.as_ref(), user_message).await {
                info!(tool = %call.name, "approval granted; dispatching");
                self.emit(AgentStatus::ToolPending {
                    tool: call.name.clone(),
                });
                let result = self.registry.dispatch(&call, user_message, &self.ctx).await;
                self.store.save_tool_response(&call.id, &result).await?;
            } else {
                info!(tool = %call.name, "approval denied");
                self.store
                    .save_tool_response(&call.id, &denial_response(&call.name))
                    .await?;
            }
        } else {
            self.store.append(vec![Message::user(user_message)]).await?;
        }

        let schemas = self.registry.schemas();

        for _hop in 0..MAX_TOOL_HOPS {
            self.emit(AgentStatus::AwaitingModel);

            let window = self.store.read_window()?;
            let summary = self.store.summary()?;
            let system_prompt = build_system_prompt(&summary);

            let reply = self.model.chat(&system_prompt, &window, &schemas).await?;
            self.store.append(vec![reply.clone().into_message()]).await?;

            match reply {
                ModelReply::Text(_) => {
                    self.emit(AgentStatus::Done);
                    return Ok(TurnOutcome::Done(self.store.read_window()?));
                }
                ModelReply::ToolCall(call) => {
                    if self.registry.requires_approval(&call.name) {
                        // Suspend without dispatching. The pending state
                        // is derivable from the stored log, so it
                        // survives a restart.
                        info!(tool = %call.name, "sensitive tool call; awaiting approval");
                        self.emit(AgentStatus::AwaitingApproval {
                            tool: call.name.clone(),
                        });
                        return Ok(TurnOutcome::AwaitingApproval { tool: call.name });
                    }

                    self.emit(AgentStatus::ToolPending {
                        tool: call.name.clone(),
                    });
                    let result = self.registry.dispatch(&call, user_message, &self.ctx).await;
                    self.store.save_tool_response(&call.id, &result).await?;
                    // Loop back to the model without new user input.
                }
            }
        }

        warn!(cap = MAX_TOOL_HOPS, "tool-chaining cap reached; ending turn");
        Ok(TurnOutcome::HopLimitReached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValetConfig;
    use crate::state::FileStore;
    use crate::types::{ChatRole, Tool, ToolCall, ToolSchema};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Model stub that plays back a script of replies and answers
    /// approval checks with a fixed verdict.
    struct ScriptedModel {
        replies: Mutex<VecDeque<ModelReply>>,
        approve: bool,
    }

    impl ScriptedModel {
        fn new(replies: Vec<ModelReply>, approve: bool) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                approve,
            })
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn chat(
            &self,
            _system_prompt: &str,
            messages: &[Message],
            _tools: &[ToolSchema],
        ) -> Result<ModelReply> {
            // The provider would reject a window leading with an
            // unmatched tool response; assert the invariant here.
            assert_ne!(
                messages.first().map(|m| m.role),
                Some(ChatRole::Tool),
                "window must not lead with a tool response"
            );
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("script exhausted"))
        }

        async fn classify_approval(&self, _user_reply: &str) -> Result<bool> {
            Ok(self.approve)
        }
    }

    struct CountingTool {
        name: &'static str,
        gated: bool,
        invocations: AtomicUsize,
    }

    impl CountingTool {
        fn new(name: &'static str, gated: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                gated,
                invocations: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "test tool"
        }
        fn parameters(&self) -> serde_json::Value {
            json!({ "type": "object", "properties": {} })
        }
        fn requires_approval(&self) -> bool {
            self.gated
        }
        async fn execute(
            &self,
            _args: &serde_json::Value,
            _user_message: &str,
            _ctx: &ToolContext,
        ) -> Result<String> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{} result", self.name))
        }
    }

    fn call(id: &str, name: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: json!({}),
        }
    }

    fn build_agent(model: Arc<dyn ModelClient>, registry: ToolRegistry) -> Agent {
        let path = std::env::temp_dir()
            .join(format!("valet-loop-test-{}.json", uuid::Uuid::new_v4()));
        let store = MessageStore::new(FileStore::open(path).unwrap(), model.clone());
        let ctx = ToolContext {
            http: reqwest::Client::new(),
            config: ValetConfig::default(),
        };
        Agent::new(store, model, registry, ctx)
    }

    #[tokio::test]
    async fn test_joke_flow_runs_to_done() {
        let joke = CountingTool::new("dad_joke", false);
        let mut registry = ToolRegistry::new();
        registry.register(joke.clone());

        let model = ScriptedModel::new(
            vec![
                ModelReply::ToolCall(call("tc_1", "dad_joke")),
                ModelReply::Text("Here's one: why did the scarecrow win an award?".to_string()),
            ],
            false,
        );
        let agent = build_agent(model, registry);

        let outcome = agent.run_turn("tell me a dad joke").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Done(_)));
        assert_eq!(joke.invocations.load(Ordering::SeqCst), 1);

        // Exactly one tool response and one final assistant message,
        // in that order, after the user message and the tool call.
        let log = agent.store.read_log().unwrap();
        assert_eq!(log.len(), 4);
        assert_eq!(log[0].message.role, ChatRole::User);
        assert!(log[1].message.tool_call.is_some());
        assert_eq!(log[2].message.role, ChatRole::Tool);
        assert_eq!(log[2].message.tool_call_id.as_deref(), Some("tc_1"));
        assert_eq!(log[3].message.role, ChatRole::Assistant);
        assert!(log[3].message.content.is_some());
    }

    #[tokio::test]
    async fn test_sensitive_tool_suspends_without_dispatch() {
        let image = CountingTool::new("generate_image", true);
        let mut registry = ToolRegistry::new();
        registry.register(image.clone());

        let model = ScriptedModel::new(
            vec![ModelReply::ToolCall(call("tc_1", "generate_image"))],
            false,
        );
        let agent = build_agent(model, registry);

        let outcome = agent.run_turn("draw me a cat").await.unwrap();
        match outcome {
            TurnOutcome::AwaitingApproval { tool } => assert_eq!(tool, "generate_image"),
            other => panic!("expected AwaitingApproval, got {other:?}"),
        }

        assert_eq!(image.invocations.load(Ordering::SeqCst), 0);
        let log = agent.store.read_log().unwrap();
        assert!(log.iter().all(|m| m.message.role != ChatRole::Tool));
    }

    #[tokio::test]
    async fn test_approval_dispatches_exactly_once_before_next_model_call() {
        let image = CountingTool::new("generate_image", true);
        let mut registry = ToolRegistry::new();
        registry.register(image.clone());

        // Turn 1 suspends on the sensitive call.
        let model = ScriptedModel::new(
            vec![ModelReply::ToolCall(call("tc_1", "generate_image"))],
            true,
        );
        let agent = build_agent(model, registry);
        agent.run_turn("draw me a cat").await.unwrap();

        // Turn 2: "yes" approves, dispatches, then the model wraps up.
        let mut registry = ToolRegistry::new();
        registry.register(image.clone());
        let model = ScriptedModel::new(
            vec![ModelReply::Text("Here is your image.".to_string())],
            true,
        );
        let agent = Agent::new(
            agent.store,
            model.clone(),
            registry,
            ToolContext {
                http: reqwest::Client::new(),
                config: ValetConfig::default(),
            },
        );

        let outcome = agent.run_turn("yes").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Done(_)));
        assert_eq!(image.invocations.load(Ordering::SeqCst), 1);

        // The tool response lands before the final assistant message,
        // and the "yes" itself is not recorded as a user message.
        let log = agent.store.read_log().unwrap();
        assert_eq!(log.len(), 4);
        assert_eq!(log[2].message.role, ChatRole::Tool);
        assert_eq!(log[2].message.tool_call_id.as_deref(), Some("tc_1"));
        assert_eq!(log[3].message.role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn test_denial_appends_canned_response_without_dispatch() {
        let image = CountingTool::new("generate_image", true);
        let mut registry = ToolRegistry::new();
        registry.register(image.clone());

        let model = ScriptedModel::new(
            vec![ModelReply::ToolCall(call("tc_1", "generate_image"))],
            false,
        );
        let agent = build_agent(model, registry);
        agent.run_turn("draw me a cat").await.unwrap();

        let mut registry = ToolRegistry::new();
        registry.register(image.clone());
        let model = ScriptedModel::new(
            vec![ModelReply::Text("Understood, no image.".to_string())],
            false,
        );
        let agent = Agent::new(
            agent.store,
            model,
            registry,
            ToolContext {
                http: reqwest::Client::new(),
                config: ValetConfig::default(),
            },
        );

        agent.run_turn("no, not now").await.unwrap();
        assert_eq!(image.invocations.load(Ordering::SeqCst), 0);

        let log = agent.store.read_log().unwrap();
        let denial = log
            .iter()
            .find(|m| m.message.role == ChatRole::Tool)
            .unwrap();
        assert!(denial
            .message
            .content
            .as_deref()
            .unwrap()
            .contains("did not approve"));
    }

    #[tokio::test]
    async fn test_hop_limit_terminates_turn() {
        let echo = CountingTool::new("echo", false);
        let mut registry = ToolRegistry::new();
        registry.register(echo.clone());

        // More tool-call replies than the cap allows.
        let script: Vec<ModelReply> = (0..MAX_TOOL_HOPS + 2)
            .map(|i| ModelReply::ToolCall(call(&format!("tc_{i}"), "echo")))
            .collect();
        let agent = build_agent(ScriptedModel::new(script, false), registry);

        let outcome = agent.run_turn("loop forever").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::HopLimitReached));
        assert_eq!(echo.invocations.load(Ordering::SeqCst), MAX_TOOL_HOPS);
    }

    #[tokio::test]
    async fn test_status_transitions_are_observed() {
        let joke = CountingTool::new("dad_joke", false);
        let mut registry = ToolRegistry::new();
        registry.register(joke);

        let model = ScriptedModel::new(
            vec![
                ModelReply::ToolCall(call("tc_1", "dad_joke")),
                ModelReply::Text("done".to_string()),
            ],
            false,
        );

        let seen: Arc<Mutex<Vec<AgentStatus>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let agent = build_agent(model, registry).with_status_callback(Box::new(move |s| {
            sink.lock().unwrap().push(s);
        }));

        agent.run_turn("joke please").await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.first(), Some(&AgentStatus::Idle));
        assert!(seen.contains(&AgentStatus::ToolPending {
            tool: "dad_joke".to_string()
        }));
        assert_eq!(seen.last(), Some(&AgentStatus::Done));
    }
}
