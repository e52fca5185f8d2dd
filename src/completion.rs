//! Chat-completion provider abstraction and the OpenAI-compatible client.
//!
//! Defines the [`CompletionProvider`] trait and one implementation,
//! [`OpenAiChatProvider`], which calls any endpoint speaking the OpenAI
//! `chat/completions` wire format (the default points at an AI proxy).
//!
//! Requests are sent once. There is no retry or backoff: a failed call
//! surfaces as an error and the relay turns it into a fallback answer.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::CompletionConfig;

/// A backend that turns a system message plus a user prompt into text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Sends one completion request and returns the assistant message text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiChatProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiChatProvider {
    /// Builds a provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the token environment variable is not set or the
    /// HTTP client cannot be built.
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let api_key = config.api_key()?;
        Self::with_api_key(config, api_key)
    }

    /// Builds a provider with an explicit token instead of reading the environment.
    pub fn with_api_key(config: &CompletionConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiChatProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Completion API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_chat_response(&json)
    }
}

/// Extracts `choices[0].message.content` from a chat-completions response.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            anyhow::anyhow!("Invalid completion response: missing choices[0].message.content")
        })
}

/// Creates the configured [`CompletionProvider`].
pub fn create_provider(config: &CompletionConfig) -> Result<Box<dyn CompletionProvider>> {
    Ok(Box::new(OpenAiChatProvider::new(config)?))
}
