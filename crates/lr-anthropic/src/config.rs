//! Anthropic configuration

use serde::{Deserialize, Serialize};
use std::env;

use lr_core::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MAX_TOKENS: u32 = 800;

/// Configuration for the Anthropic Messages API client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
}

impl AnthropicConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::Configuration("ANTHROPIC_API_KEY environment variable not found".to_string())
            })?;

        let mut config = Self::new(api_key);

        if let Ok(model) = env::var("ANTHROPIC_MODEL") {
            if !model.trim().is_empty() {
                config.model = model.trim().to_string();
            }
        }

        if let Ok(base_url) = env::var("ANTHROPIC_BASE_URL") {
            if !base_url.trim().is_empty() {
                config.base_url = base_url.trim().to_string();
            }
        }

        if let Ok(raw) = env::var("ANTHROPIC_MAX_TOKENS") {
            config.max_tokens = raw.trim().parse().map_err(|_| {
                Error::Configuration(format!("ANTHROPIC_MAX_TOKENS has an invalid value: {}", raw))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Create configuration with explicit values
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: crate::AnthropicClient::CLAUDE_SONNET_4.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url).map_err(|e| {
            Error::Configuration(format!("ANTHROPIC_BASE_URL is not a valid URL: {}", e))
        })?;
        if self.max_tokens == 0 {
            return Err(Error::Configuration(
                "ANTHROPIC_MAX_TOKENS must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
