//! OpenAI-compatible chat-completion client.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::errors::CoreError;
use crate::llm::Llm;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_base: "https://api.openai.com/v1".to_string(),
            model,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn build_request_body(&self, system: &str, user: &str) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });
        if let Some(temperature) = self.temperature {
            body["temperature"] = temperature.into();
        }
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = max_tokens.into();
        }
        body
    }
}

#[async_trait]
impl Llm for OpenAiClient {
    async fn generate(&self, system: &str, user: &str) -> Result<String, CoreError> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request_body(system, user);
        log::debug!("chat completion request to {} (model {})", url, self.model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::Upstream(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| CoreError::Upstream(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(CoreError::Upstream(format!(
                "chat completion failed with status {}: {}",
                status, response_text
            )));
        }

        let parsed: Value = serde_json::from_str(&response_text)
            .map_err(|e| CoreError::Upstream(format!("invalid completion JSON: {}", e)))?;
        parsed["choices"][0]["message"]["content"]
            .as_str()
            .map(|content| content.trim().to_string())
            .ok_or_else(|| {
                CoreError::Upstream(format!(
                    "completion response missing content: {}",
                    response_text
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_carries_model_messages_and_temperature() {
        let client = OpenAiClient::new("sk-test".to_string(), "gpt-4o-mini".to_string())
            .with_temperature(0.3);
        let body = client.build_request_body("extract keywords", "cats and dogs");

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["temperature"], 0.3);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "extract keywords");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "cats and dogs");
    }

    #[test]
    fn max_tokens_is_omitted_unless_set() {
        let client = OpenAiClient::new("sk-test".to_string(), "gpt-4o-mini".to_string());
        let body = client.build_request_body("s", "u");
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn api_base_trailing_slash_is_trimmed() {
        let client = OpenAiClient::new("sk".to_string(), "m".to_string())
            .with_api_base("https://proxy.example/v1/".to_string());
        assert_eq!(client.api_base, "https://proxy.example/v1");
    }
}
