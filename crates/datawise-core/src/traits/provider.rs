//! Decision-service abstraction.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Message, ProviderResponse, ToolDefinition};

/// Sampling parameters for one chat request.
#[derive(Debug, Clone, Default)]
pub struct GenerateParams {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// An external service that reads a conversation plus a capability list and
/// answers with either tool calls or final text.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        params: &GenerateParams,
    ) -> Result<ProviderResponse>;
}
