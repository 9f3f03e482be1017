//! Configuration loaded from environment variables.

use std::env;

/// Completion service settings. The service is optional: when disabled or
/// missing an API key, draft generation runs keyword-only.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub enabled: bool,
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.api_key.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub query_timeout_secs: u64,
    pub openai: OpenAiConfig,
}

impl Config {
    /// Read configuration from the environment. A `.env` file is honored
    /// when present.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            db_path: env::var("DB_PATH").unwrap_or_else(|_| "inventory.db".to_string()),
            query_timeout_secs: env::var("QUERY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            openai: OpenAiConfig {
                api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
                model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                base_url: env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                enabled: env::var("OPENAI_ENABLED")
                    .map(|v| v.to_lowercase() != "false")
                    .unwrap_or(true),
                timeout_secs: env::var("OPENAI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            },
        }
    }
}
