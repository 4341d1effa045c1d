//! Tool Dispatcher
//!
//! A registry of declared tool schemas plus the dispatch path: resolve
//! by name, validate arguments against the declared parameter schema,
//! invoke, and fold the outcome into a text result. Failures on this
//! path become error strings the model can read and react to on its
//! next turn; nothing here propagates a fault to the loop.

pub mod image;
pub mod joke;
pub mod search;

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::types::{Tool, ToolCall, ToolContext, ToolSchema};

pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// The full built-in set: joke fetching, image generation, content search.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(joke::DadJokeTool));
        registry.register(Arc::new(image::GenerateImageTool));
        registry.register(Arc::new(search::ContentSearchTool));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Declared schemas, in registration order, for the model call.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .iter()
            .map(|t| ToolSchema {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters(),
            })
            .collect()
    }

    /// Whether dispatching `name` requires explicit human approval.
    /// Unknown names are not approval-gated; dispatch reports them.
    pub fn requires_approval(&self, name: &str) -> bool {
        self.get(name).map(|t| t.requires_approval()).unwrap_or(false)
    }

    /// Invoke the tool named by `call`. Always returns a text result:
    /// unknown tool, schema-invalid arguments, and tool-level failures
    /// all come back as short error strings.
    pub async fn dispatch(&self, call: &ToolCall, user_message: &str, ctx: &ToolContext) -> String {
        let tool = match self.get(&call.name) {
            Some(tool) => tool,
            None => {
                warn!(tool = %call.name, "dispatch of unknown tool");
                return format!("Error: unknown tool '{}'", call.name);
            }
        };

        if let Err(reason) = validate_arguments(&call.arguments, &tool.parameters()) {
            warn!(tool = %call.name, %reason, "tool arguments failed validation");
            return format!("Error: invalid arguments for '{}': {}", call.name, reason);
        }

        info!(tool = %call.name, "executing tool");
        match tool.execute(&call.arguments, user_message, ctx).await {
            Ok(result) => result,
            Err(err) => {
                warn!(tool = %call.name, error = %err, "tool execution failed");
                format!("Error: tool '{}' failed: {}", call.name, err)
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Validate `args` against a declared parameter schema
/// (`type: object` with `properties` and an optional `required` list).
///
/// Checks presence of required properties and the primitive type of
/// every supplied property. Returns a human-readable reason on failure.
pub fn validate_arguments(args: &Value, schema: &Value) -> Result<(), String> {
    let args_obj = args
        .as_object()
        .ok_or_else(|| "arguments must be a JSON object".to_string())?;

    let properties = schema["properties"].as_object();

    if let Some(required) = schema["required"].as_array() {
        for key in required.iter().filter_map(|k| k.as_str()) {
            if !args_obj.contains_key(key) {
                return Err(format!("missing required property '{key}'"));
            }
        }
    }

    if let Some(properties) = properties {
        for (key, value) in args_obj {
            let Some(declared) = properties.get(key) else {
                continue; // tolerate extra properties the model invents
            };
            let Some(expected) = declared["type"].as_str() else {
                continue;
            };
            if !type_matches(value, expected) {
                return Err(format!("property '{key}' must be of type {expected}"));
            }
        }
    }

    Ok(())
}

fn type_matches(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}
