use crate::assist::{AssistantError, LanguageAssistant};
use crate::config::AssistantConfig;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Chat-completions client for the assistant tier.
///
/// `base_url` is overridable so tests can point it at a local mock server,
/// and the per-call timeout is deliberately short: this tier only runs when
/// the batch still has slack, and a slow assistant must not eat the rest of
/// the budget.
pub struct OpenAiAssistant {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiAssistant {
    /// Build from configuration. The key comes from config or the
    /// OPENAI_API_KEY environment variable.
    pub fn new(config: &AssistantConfig, timeout: Duration) -> Result<Self, AssistantError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                AssistantError::NotConfigured(
                    "no api_key in config and OPENAI_API_KEY is unset".to_string(),
                )
            })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LanguageAssistant for OpenAiAssistant {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, AssistantError> {
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": system},
                    {"role": "user", "content": user}
                ],
                "temperature": 0.1
            }))
            .send()
            .await?;

        let body: Value = response.json().await?;
        debug!("assistant response: {body:?}");

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                AssistantError::MalformedResponse("no content in first choice".to_string())
            })
    }
}
