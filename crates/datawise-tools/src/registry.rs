//! Tool registry: named capabilities offered to the decision service.

use datawise_core::config::AppConfig;
use datawise_core::traits::Tool;
use datawise_core::types::ToolDefinition;

use crate::sql_query::SqlQueryTool;
use crate::web_search::{SearchClient, WebSearchTool};

/// Ordered set of tools, unique by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One query tool per configured dataset, in configuration order, then `websearch`.
    pub fn from_config(config: &AppConfig, http: reqwest::Client) -> Self {
        let mut registry = Self::new();
        for entry in &config.datasets {
            registry.register(Box::new(SqlQueryTool::from_dataset(entry)));
        }
        registry.register(Box::new(WebSearchTool::new(SearchClient::new(
            http,
            &config.search,
        ))));
        tracing::debug!(tools = ?registry.names(), "tool registry ready");
        registry
    }

    /// Add a tool. A tool with the same name is replaced in place.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(idx) => {
                tracing::warn!(tool = tool.name(), "replacing registered tool");
                self.tools[idx] = tool;
            }
            None => self.tools.push(tool),
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
