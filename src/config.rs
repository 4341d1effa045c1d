//! Valet Configuration
//!
//! Loads and saves the assistant's configuration from `~/.valet/valet.json`.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Config file name within the valet directory.
const CONFIG_FILENAME: &str = "valet.json";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValetConfig {
    /// Base URL of the OpenAI-compatible chat completions API.
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f64,
    /// Path to the persisted conversation document.
    pub store_path: String,
    /// Vector index endpoint used by the content search tool.
    pub index_url: String,
    pub index_token: String,
    /// Endpoint for the dad joke tool.
    pub joke_api_url: String,
}

impl Default for ValetConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            store_path: "~/.valet/conversation.json".to_string(),
            index_url: String::new(),
            index_token: String::new(),
            joke_api_url: "https://icanhazdadjoke.com".to_string(),
        }
    }
}

/// Returns the valet config directory: `~/.valet`.
pub fn get_valet_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/root"))
        .join(".valet")
}

/// Returns the full path to the config file: `~/.valet/valet.json`.
pub fn get_config_path() -> PathBuf {
    get_valet_dir().join(CONFIG_FILENAME)
}

/// Load the config from disk, merging missing fields with defaults and
/// falling back to `OPENAI_API_KEY` from the environment when the file
/// does not carry a key. Returns defaults if no config file exists.
pub fn load_config() -> ValetConfig {
    let config_path = get_config_path();

    let mut config = if config_path.exists() {
        fs::read_to_string(&config_path)
            .ok()
            .and_then(|s| serde_json::from_str::<ValetConfig>(&s).ok())
            .unwrap_or_default()
    } else {
        ValetConfig::default()
    };

    let defaults = ValetConfig::default();

    if config.api_url.is_empty() {
        config.api_url = defaults.api_url;
    }
    if config.model.is_empty() {
        config.model = defaults.model;
    }
    if config.store_path.is_empty() {
        config.store_path = defaults.store_path;
    }
    if config.joke_api_url.is_empty() {
        config.joke_api_url = defaults.joke_api_url;
    }

    if config.api_key.is_empty() {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.api_key = key;
        }
    }
    if config.index_token.is_empty() {
        if let Ok(token) = std::env::var("VECTOR_INDEX_TOKEN") {
            config.index_token = token;
        }
    }

    config
}

/// Save the config to disk at `~/.valet/valet.json`.
///
/// Creates the valet directory with mode 0o700 if it does not exist.
/// The file is written with mode 0o600 since it may contain API keys.
pub fn save_config(config: &ValetConfig) -> Result<()> {
    let dir = get_valet_dir();
    if !dir.exists() {
        fs::create_dir_all(&dir).context("Failed to create valet directory")?;
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))?;
    }

    let config_path = get_config_path();
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(&config_path, &json).context("Failed to write config file")?;
    fs::set_permissions(&config_path, fs::Permissions::from_mode(0o600))?;

    Ok(())
}

/// Resolve a path that may start with `~` to an absolute path.
pub fn resolve_path(p: &str) -> String {
    if let Some(rest) = p.strip_prefix('~') {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        home.join(rest).to_string_lossy().to_string()
    } else {
        p.to_string()
    }
}
