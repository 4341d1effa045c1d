//! OpenAI-compatible Chat Client
//!
//! Wraps a /v1/chat/completions endpoint. Parallel tool calls are
//! disabled at the request level, so a reply carries either content or
//! exactly one tool call; anything else is rejected at the boundary
//! instead of leaking ambiguous shapes into the loop.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::types::{ChatRole, Message, ModelClient, ModelReply, ToolCall, ToolSchema};

pub struct OpenAiClient {
    api_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    http: Client,
}

impl OpenAiClient {
    pub fn new(api_url: String, api_key: String, model: String, temperature: f64) -> Self {
        Self {
            api_url,
            api_key,
            model,
            temperature,
            http: Client::new(),
        }
    }

    async fn completions(&self, body: &Value) -> Result<Value> {
        let url = format!("{}/v1/chat/completions", self.api_url);
        let resp = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("chat completion error: {}: {}", status.as_u16(), text);
        }

        resp.json().await.context("failed to parse chat completion response")
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn chat(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<ModelReply> {
        let mut formatted: Vec<Value> = vec![json!({
            "role": "system",
            "content": system_prompt,
        })];
        formatted.extend(messages.iter().map(format_message));

        let mut body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": formatted,
        });

        if !tools.is_empty() {
            body["tools"] = json!(tools
                .iter()
                .map(|t| json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                }))
                .collect::<Vec<_>>());
            body["tool_choice"] = json!("auto");
            body["parallel_tool_calls"] = json!(false);
        }

        debug!(model = %self.model, messages = messages.len(), "calling model");
        let data = self.completions(&body).await?;

        let message = data["choices"]
            .get(0)
            .map(|c| &c["message"])
            .ok_or_else(|| anyhow::anyhow!("no completion choice returned"))?;

        parse_reply(message)
    }

    async fn classify_approval(&self, user_reply: &str) -> Result<bool> {
        let body = json!({
            "model": self.model,
            "temperature": 0.1,
            "messages": [
                {
                    "role": "system",
                    "content": "Determine whether the user approved the pending action. \
                                If you are not sure, it is not approved.",
                },
                { "role": "user", "content": user_reply },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "approval",
                    "strict": true,
                    "schema": {
                        "type": "object",
                        "properties": {
                            "approved": {
                                "type": "boolean",
                                "description": "did the user approve the action or not"
                            }
                        },
                        "required": ["approved"],
                        "additionalProperties": false
                    }
                }
            },
        });

        let data = self.completions(&body).await?;
        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("no classification content returned"))?;

        let parsed: Value =
            serde_json::from_str(content).context("classification was not valid JSON")?;
        parsed["approved"]
            .as_bool()
            .ok_or_else(|| anyhow::anyhow!("classification missing boolean 'approved' field"))
    }
}

/// Format a message into the wire shape the provider expects.
fn format_message(msg: &Message) -> Value {
    let role = match msg.role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
        ChatRole::Tool => "tool",
    };

    let mut formatted = json!({
        "role": role,
        "content": msg.content.clone().unwrap_or_default(),
    });

    if let Some(ref call) = msg.tool_call {
        formatted["tool_calls"] = json!([{
            "id": call.id,
            "type": "function",
            "function": {
                "name": call.name,
                "arguments": call.arguments.to_string(),
            }
        }]);
    }

    if let Some(ref id) = msg.tool_call_id {
        formatted["tool_call_id"] = json!(id);
    }

    formatted
}

/// Collapse the provider's message object into the tagged reply variant.
fn parse_reply(message: &Value) -> Result<ModelReply> {
    if let Some(calls) = message["tool_calls"].as_array() {
        let first = calls
            .first()
            .ok_or_else(|| anyhow::anyhow!("empty tool_calls array in reply"))?;

        let arguments_raw = first["function"]["arguments"].as_str().unwrap_or("{}");
        let arguments: Value = serde_json::from_str(arguments_raw)
            .context("tool call arguments were not valid JSON")?;

        return Ok(ModelReply::ToolCall(ToolCall {
            id: first["id"].as_str().unwrap_or_default().to_string(),
            name: first["function"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            arguments,
        }));
    }

    match message["content"].as_str() {
        Some(content) if !content.is_empty() => Ok(ModelReply::Text(content.to_string())),
        _ => anyhow::bail!("model reply carried neither content nor a tool call"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_reply() {
        let message = json!({ "role": "assistant", "content": "hello there" });
        let reply = parse_reply(&message).unwrap();
        assert_eq!(reply, ModelReply::Text("hello there".to_string()));
    }

    #[test]
    fn test_parse_tool_call_reply() {
        let message = json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "tc_42",
                "type": "function",
                "function": { "name": "dad_joke", "arguments": "{\"query\":\"cats\"}" }
            }]
        });
        match parse_reply(&message).unwrap() {
            ModelReply::ToolCall(call) => {
                assert_eq!(call.id, "tc_42");
                assert_eq!(call.name, "dad_joke");
                assert_eq!(call.arguments["query"], "cats");
            }
            other => panic!("expected tool call, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_empty_reply() {
        let message = json!({ "role": "assistant", "content": null });
        assert!(parse_reply(&message).is_err());
    }

    #[test]
    fn test_format_tool_response_message() {
        let msg = Message::tool_response("tc_1", "result text");
        let formatted = format_message(&msg);
        assert_eq!(formatted["role"], "tool");
        assert_eq!(formatted["tool_call_id"], "tc_1");
        assert_eq!(formatted["content"], "result text");
    }

    #[test]
    fn test_format_assistant_tool_call() {
        let msg = Message::assistant_tool_call(ToolCall {
            id: "tc_9".to_string(),
            name: "generate_image".to_string(),
            arguments: json!({ "prompt": "a cat" }),
        });
        let formatted = format_message(&msg);
        assert_eq!(formatted["tool_calls"][0]["id"], "tc_9");
        assert_eq!(
            formatted["tool_calls"][0]["function"]["name"],
            "generate_image"
        );
    }
}
