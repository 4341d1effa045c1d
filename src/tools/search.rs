//! Content Search Tool
//!
//! Vector-index lookup over ingested content (movie metadata in the
//! stock setup). The index itself is an external collaborator reached
//! over HTTP; this tool only shapes the query and flattens the hits.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::types::{Tool, ToolContext};

const TOP_K: u32 = 5;

pub struct ContentSearchTool;

#[async_trait]
impl Tool for ContentSearchTool {
    fn name(&self) -> &str {
        "content_search"
    }

    fn description(&self) -> &str {
        "use this tool to find movies or answer questions about movies and their metadata \
         like score, rating, costs, director, actors and more."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "query used to vector search the content index"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(
        &self,
        args: &Value,
        _user_message: &str,
        ctx: &ToolContext,
    ) -> Result<String> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("missing 'query' argument"))?;

        if ctx.config.index_url.is_empty() {
            anyhow::bail!("no content index configured");
        }

        let url = format!("{}/query", ctx.config.index_url.trim_end_matches('/'));
        let body = json!({
            "data": query,
            "topK": TOP_K,
            "includeData": true,
            "includeMetadata": true,
        });

        let data: Value = ctx
            .http
            .post(&url)
            .bearer_auth(&ctx.config.index_token)
            .json(&body)
            .send()
            .await
            .context("content index query failed")?
            .error_for_status()
            .context("content index returned an error status")?
            .json()
            .await
            .context("content index response was not JSON")?;

        let hits = data["result"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let formatted: Vec<Value> = hits.iter().map(flatten_hit).collect();
        serde_json::to_string_pretty(&formatted).context("failed to format search results")
    }
}

/// Flatten one index hit to its metadata plus the matched text as
/// `description`.
fn flatten_hit(hit: &Value) -> Value {
    let mut out: Map<String, Value> = hit["metadata"]
        .as_object()
        .cloned()
        .unwrap_or_default();
    if let Some(text) = hit["data"].as_str() {
        out.insert("description".to_string(), Value::String(text.to_string()));
    }
    Value::Object(out)
}
