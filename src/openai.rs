use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;

use crate::generate::TextGenerator;
use crate::http;
use crate::retry::{RetryPolicy, with_retry};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl OpenAiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY is not set"))?;
        let base_url = std::env::var("WPMIGRATE_OPENAI_BASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let model = std::env::var("WPMIGRATE_OPENAI_MODEL")
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

pub struct OpenAiGenerator {
    client: reqwest::Client,
    endpoint: String,
    config: OpenAiConfig,
    retry: RetryPolicy,
}

impl OpenAiGenerator {
    pub fn new(config: OpenAiConfig, retry: RetryPolicy) -> anyhow::Result<Self> {
        let client = http::build_client(Duration::from_secs(300), false)?;
        Ok(Self {
            client,
            endpoint: responses_endpoint(&config.base_url),
            config,
            retry,
        })
    }

    pub fn from_env(retry: RetryPolicy) -> anyhow::Result<Self> {
        Self::new(OpenAiConfig::from_env()?, retry)
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str, system_prompt: &str) -> anyhow::Result<String> {
        tracing::debug!(model = %self.config.model, "openai generate");
        with_retry(&self.retry, "OpenAI generate", || {
            responses_text(
                &self.client,
                &self.endpoint,
                &self.config.api_key,
                &self.config.model,
                system_prompt,
                prompt,
                TEMPERATURE,
            )
        })
        .await
    }
}

pub fn responses_endpoint(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/responses")
}

pub async fn responses_text(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    model: &str,
    instructions: &str,
    input: &str,
    temperature: f32,
) -> anyhow::Result<String> {
    let mut body = serde_json::json!({
        "model": model,
        "instructions": instructions,
        "input": input,
        "text": { "format": { "type": "text" } },
        "store": false,
    });

    // GPT-5 models reject sampling params like `temperature`.
    if !model.starts_with("gpt-5")
        && let Some(obj) = body.as_object_mut()
    {
        obj.insert("temperature".to_owned(), serde_json::json!(temperature));
    }

    let response = client
        .post(endpoint)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .with_context(|| format!("POST {endpoint}"))?;

    let status = response.status();
    let raw = response.text().await.context("read OpenAI response body")?;
    if !status.is_success() {
        let message =
            parse_error_message(&raw).unwrap_or_else(|| http::excerpt(&raw, 200));
        anyhow::bail!("OpenAI API error ({status}): {message}");
    }

    let value: serde_json::Value = serde_json::from_str(&raw).context("parse OpenAI response")?;
    extract_output_text(&value).context("extract output text")
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

fn extract_output_text(value: &serde_json::Value) -> anyhow::Result<String> {
    let output = value
        .get("output")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow::anyhow!("missing `output` array in response"))?;

    let mut text = String::new();
    for item in output {
        if item.get("type").and_then(|v| v.as_str()) != Some("message") {
            continue;
        }
        let Some(content) = item.get("content").and_then(|v| v.as_array()) else {
            continue;
        };
        for part in content {
            if part.get("type").and_then(|v| v.as_str()) != Some("output_text") {
                continue;
            }
            if let Some(part_text) = part.get("text").and_then(|v| v.as_str()) {
                text.push_str(part_text);
            }
        }
    }

    if text.trim().is_empty() {
        anyhow::bail!("OpenAI output text is empty");
    }
    Ok(text)
}
