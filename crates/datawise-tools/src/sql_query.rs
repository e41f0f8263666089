//! Dataset query tool: runs the SQL it is given, verbatim, against one store.
//!
//! Trusted input only. Nothing here inspects or restricts the statement, so a
//! decision service can issue `DELETE` or `DROP` as easily as `SELECT`.

use std::path::PathBuf;

use async_trait::async_trait;
use datawise_core::config::DatasetEntry;
use datawise_core::error::{DatawiseError, Result};
use datawise_core::traits::Tool;
use datawise_core::types::{ToolDefinition, ToolResult};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct QueryArgs {
    query: String,
}

pub struct SqlQueryTool {
    name: String,
    description: String,
    table: String,
    store: PathBuf,
}

impl SqlQueryTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        table: impl Into<String>,
        store: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            table: table.into(),
            store: store.into(),
        }
    }

    pub fn from_dataset(entry: &DatasetEntry) -> Self {
        Self::new(
            entry.tool_name(),
            entry.tool_description(),
            entry.table_name(),
            entry.store.clone(),
        )
    }
}

#[async_trait]
impl Tool for SqlQueryTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": format!(
                            "SQLite query to run; the data is in the `{}` table",
                            self.table
                        )
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
            returns: serde_json::json!({
                "type": "string",
                "description": "Result rows as a list of tuples"
            }),
        }
    }

    async fn execute(&self, arguments: &str) -> Result<ToolResult> {
        let args: QueryArgs =
            serde_json::from_str(arguments).map_err(|e| DatawiseError::InvalidToolArguments {
                tool: self.name.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(tool = %self.name, query = %args.query, "running query");

        let store = self.store.clone();
        let rows = tokio::task::spawn_blocking(move || datawise_store::execute(&store, &args.query))
            .await
            .map_err(|e| DatawiseError::Tool(format!("query task failed: {e}")))??;

        Ok(ToolResult {
            output: rows.render(),
        })
    }
}
