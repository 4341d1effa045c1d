//! Dad Joke Tool
//!
//! Fetches a random dad joke, or searches the joke corpus when the
//! model supplies a query.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::types::{Tool, ToolContext};

pub struct DadJokeTool;

#[async_trait]
impl Tool for DadJokeTool {
    fn name(&self) -> &str {
        "dad_joke"
    }

    fn description(&self) -> &str {
        "use this tool to get a dad joke. Optionally pass a query to search for jokes about a topic."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "optional topic to search jokes for"
                }
            }
        })
    }

    async fn execute(
        &self,
        args: &Value,
        _user_message: &str,
        ctx: &ToolContext,
    ) -> Result<String> {
        let base = ctx.config.joke_api_url.trim_end_matches('/');

        if let Some(query) = args["query"].as_str().filter(|q| !q.is_empty()) {
            let url = format!("{}/search?term={}", base, urlencoding::encode(query));
            let data: Value = ctx
                .http
                .get(&url)
                .header("Accept", "application/json")
                .send()
                .await
                .context("joke search request failed")?
                .error_for_status()
                .context("joke search returned an error status")?
                .json()
                .await
                .context("joke search response was not JSON")?;

            let jokes: Vec<&str> = data["results"]
                .as_array()
                .map(|r| r.iter().filter_map(|j| j["joke"].as_str()).take(3).collect())
                .unwrap_or_default();

            if jokes.is_empty() {
                return Ok(format!("No jokes found about '{query}'."));
            }
            return Ok(jokes.join("\n"));
        }

        let data: Value = ctx
            .http
            .get(base)
            .header("Accept", "application/json")
            .send()
            .await
            .context("joke request failed")?
            .error_for_status()
            .context("joke API returned an error status")?
            .json()
            .await
            .context("joke response was not JSON")?;

        data["joke"]
            .as_str()
            .map(|j| j.to_string())
            .ok_or_else(|| anyhow::anyhow!("joke response missing 'joke' field"))
    }
}
