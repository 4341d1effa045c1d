//! Image Generation Tool
//!
//! The one sensitive tool in the built-in set: dispatch is gated behind
//! explicit human approval by the agent loop.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::types::{Tool, ToolContext};

pub struct GenerateImageTool;

#[async_trait]
impl Tool for GenerateImageTool {
    fn name(&self) -> &str {
        "generate_image"
    }

    fn description(&self) -> &str {
        "use this tool to generate an image from a text prompt. Returns the image URL."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "prompt describing the image to generate, based on the user's message"
                }
            },
            "required": ["prompt"]
        })
    }

    fn requires_approval(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        args: &Value,
        user_message: &str,
        ctx: &ToolContext,
    ) -> Result<String> {
        // Schema validation guarantees presence; the fallback keeps this
        // total if called directly.
        let prompt = args["prompt"].as_str().unwrap_or(user_message);

        let url = format!(
            "{}/v1/images/generations",
            ctx.config.api_url.trim_end_matches('/')
        );
        let body = json!({
            "model": "dall-e-3",
            "prompt": prompt,
            "n": 1,
            "size": "1024x1024",
        });

        let data: Value = ctx
            .http
            .post(&url)
            .bearer_auth(&ctx.config.api_key)
            .json(&body)
            .send()
            .await
            .context("image generation request failed")?
            .error_for_status()
            .context("image generation returned an error status")?
            .json()
            .await
            .context("image generation response was not JSON")?;

        data["data"][0]["url"]
            .as_str()
            .map(|u| u.to_string())
            .ok_or_else(|| anyhow::anyhow!("image generation response missing image URL"))
    }
}
