//! # Datawise Providers
//!
//! Decision-service implementations. Any OpenAI-compatible chat-completions
//! endpoint (OpenAI, Ollama, vLLM, OpenRouter, ...) is handled by
//! [`openai_compatible::OpenAiCompatibleProvider`]; endpoints differ only by
//! base URL, key and model name.

pub mod openai_compatible;

use datawise_core::config::LlmConfig;
use datawise_core::error::Result;
use datawise_core::traits::Provider;

/// Create the decision-service provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Box<dyn Provider>> {
    Ok(Box::new(
        openai_compatible::OpenAiCompatibleProvider::from_config(config)?,
    ))
}
