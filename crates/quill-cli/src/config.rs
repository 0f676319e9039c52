//! Configuration file and environment support

use quill_ai::{Endpoint, providers::azure::DEFAULT_API_VERSION};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_API_BASE: &str = "OPENAI_API_BASE";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_MODEL: &str = "OPENAI_API_MODEL_NAME";

/// Configuration for ai
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Endpoint base URL
    pub api_base: Option<String>,
    /// API key (environment variables are preferred)
    pub api_key: Option<String>,
    /// Deployment/model name
    pub model: Option<String>,
    /// api-version query parameter
    pub api_version: Option<String>,
    /// Default system prompt
    pub system_prompt: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quill")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("QUILL_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Write an example config file if none exists
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, example_config())?;
        Ok(path)
    }

    /// Resolve the endpoint: environment first, then this file
    pub fn endpoint(&self, env: impl Fn(&str) -> Option<String>) -> quill_ai::Result<Endpoint> {
        let pick = |var: &str, fallback: &Option<String>| {
            env(var)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| fallback.clone())
                .unwrap_or_default()
        };
        let endpoint = Endpoint::new(
            pick(ENV_API_BASE, &self.api_base),
            pick(ENV_API_KEY, &self.api_key),
            pick(ENV_MODEL, &self.model),
        )?;
        Ok(endpoint.with_api_version(
            self.api_version
                .clone()
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        ))
    }

    /// Request timeout, if configured
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# ai configuration file
# Environment variables OPENAI_API_BASE, OPENAI_API_KEY and
# OPENAI_API_MODEL_NAME take precedence over the values below.

# api_base = "https://my-resource.openai.azure.com"
# model = "gpt-35-turbo"
# api_version = "2023-05-15"

# It's recommended to keep the key in the environment instead
# api_key = "..."

# Default system prompt (optional)
# system_prompt = "You are a helpful assistant."

# Seconds to wait for a reply before giving up
# timeout_secs = 8
"#
}
