//! Capability abstraction.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ToolDefinition, ToolResult};

/// A named, described operation the decision service may invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn definition(&self) -> ToolDefinition;

    /// Run the tool with the raw JSON argument text from the tool call.
    async fn execute(&self, arguments: &str) -> Result<ToolResult>;
}
