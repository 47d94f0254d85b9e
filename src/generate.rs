use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;

use crate::anthropic::AnthropicGenerator;
use crate::openai::OpenAiGenerator;
use crate::retry::RetryPolicy;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, system_prompt: &str) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RewriteEngine {
    /// Keep the original copy.
    None,
    Openai,
    Anthropic,
}

pub fn build_generator(
    engine: RewriteEngine,
    retry: RetryPolicy,
) -> anyhow::Result<Option<Arc<dyn TextGenerator>>> {
    let generator: Arc<dyn TextGenerator> = match engine {
        RewriteEngine::None => return Ok(None),
        RewriteEngine::Openai => {
            Arc::new(OpenAiGenerator::from_env(retry).context("initialize OpenAI generator")?)
        }
        RewriteEngine::Anthropic => Arc::new(
            AnthropicGenerator::from_env(retry).context("initialize Anthropic generator")?,
        ),
    };
    Ok(Some(generator))
}
