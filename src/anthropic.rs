use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;

use crate::generate::TextGenerator;
use crate::http;
use crate::retry::{RetryPolicy, with_retry};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";

const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4000;

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl AnthropicConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = ["ANTHROPIC_API_KEY", "CLAUDE_API_KEY"]
            .into_iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("ANTHROPIC_API_KEY (or CLAUDE_API_KEY) is not set"))?;
        let base_url = std::env::var("WPMIGRATE_ANTHROPIC_BASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let model = std::env::var("WPMIGRATE_ANTHROPIC_MODEL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_owned());
        Ok(Self {
            base_url,
            api_key,
            model,
        })
    }
}

pub struct AnthropicGenerator {
    client: reqwest::Client,
    endpoint: String,
    config: AnthropicConfig,
    retry: RetryPolicy,
}

impl AnthropicGenerator {
    pub fn new(config: AnthropicConfig, retry: RetryPolicy) -> anyhow::Result<Self> {
        let client = http::build_client(Duration::from_secs(300), false)?;
        Ok(Self {
            client,
            endpoint: format!("{}/messages", config.base_url.trim_end_matches('/')),
            config,
            retry,
        })
    }

    pub fn from_env(retry: RetryPolicy) -> anyhow::Result<Self> {
        Self::new(AnthropicConfig::from_env()?, retry)
    }

    async fn messages_text(&self, prompt: &str, system_prompt: &str) -> anyhow::Result<String> {
        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": MAX_TOKENS,
            "system": system_prompt,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {}", self.endpoint))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .context("read Anthropic response body")?;
        if !status.is_success() {
            let message =
                parse_error_message(&raw).unwrap_or_else(|| http::excerpt(&raw, 200));
            anyhow::bail!("Anthropic API error ({status}): {message}");
        }

        let value: serde_json::Value =
            serde_json::from_str(&raw).context("parse Anthropic response")?;
        first_text_block(&value)
    }
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    async fn generate(&self, prompt: &str, system_prompt: &str) -> anyhow::Result<String> {
        tracing::debug!(model = %self.config.model, "anthropic generate");
        with_retry(&self.retry, "Anthropic generate", || {
            self.messages_text(prompt, system_prompt)
        })
        .await
    }
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

/// Text of the first content block; non-text first blocks count as empty.
fn first_text_block(value: &serde_json::Value) -> anyhow::Result<String> {
    let first = value
        .get("content")
        .and_then(|v| v.as_array())
        .and_then(|blocks| blocks.first())
        .ok_or_else(|| anyhow::anyhow!("missing `content` in Anthropic response"))?;
    let text = match first.get("type").and_then(|v| v.as_str()) {
        Some("text") => first.get("text").and_then(|v| v.as_str()).unwrap_or_default(),
        _ => "",
    };
    if text.trim().is_empty() {
        anyhow::bail!("Anthropic output text is empty");
    }
    Ok(text.to_owned())
}
