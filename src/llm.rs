//! Completion service client.
//!
//! Talks to an OpenAI-compatible chat completions endpoint, constrained to
//! JSON-object responses and bounded by a request timeout. The generation
//! pipeline goes through the `ChatApi` trait so tests can stub the service.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{NlqError, Result};

#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Send one system+user exchange and return the JSON object the model
    /// was instructed to produce.
    async fn chat_json(&self, system: &str, user: &str, temperature: f64) -> Result<Value>;
}

pub struct LlmClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NlqError::Generation(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            model,
            base_url,
            client,
        })
    }
}

#[async_trait]
impl ChatApi for LlmClient {
    async fn chat_json(&self, system: &str, user: &str, temperature: f64) -> Result<Value> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "response_format": {"type": "json_object"},
            "temperature": temperature
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| NlqError::Generation(format!("Completion request failed: {}", e)))?;

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| NlqError::Generation(format!("Failed to read completion response: {}", e)))?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| NlqError::Generation("No content in completion response".to_string()))?;

        serde_json::from_str(&extract_json(content))
            .map_err(|e| NlqError::Generation(format!("Completion returned invalid JSON: {}", e)))
    }
}

/// Extract a JSON object from a model response (handles markdown code
/// blocks and surrounding prose).
fn extract_json(response: &str) -> String {
    if let (Some(start), Some(end)) = (response.find('{'), response.rfind('}')) {
        if start <= end {
            return response[start..=end].to_string();
        }
    }

    if let Some(start) = response.find("```json") {
        let after = &response[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }
    if let Some(start) = response.find("```") {
        let after = &response[start + 3..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    response.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_plain() {
        let response = r#"{"sql": "SELECT 1"}"#;
        assert_eq!(extract_json(response), r#"{"sql": "SELECT 1"}"#);
    }

    #[test]
    fn test_extract_json_with_fence() {
        let response = "Here's the query:\n```json\n{\"sql\": \"SELECT 1\"}\n```";
        let extracted = extract_json(response);
        assert!(serde_json::from_str::<Value>(&extracted).is_ok());
        assert!(extracted.contains("SELECT 1"));
    }

    #[test]
    fn test_extract_json_with_prose() {
        let response = "Sure thing: {\"needsRevision\": false} hope that helps";
        assert_eq!(extract_json(response), r#"{"needsRevision": false}"#);
    }
}
