//! Web search tool backed by the Tavily `/search` API.
//!
//! Hits come back in provider order as `{title, url, snippet}` records. A hit
//! missing one of its fields is kept with that field empty, so the result
//! count always equals the number of hits the provider reported.

use async_trait::async_trait;
use datawise_core::config::{SearchConfig, Secret};
use datawise_core::error::{DatawiseError, Result};
use datawise_core::traits::Tool;
use datawise_core::types::{SearchResult, SearchResults, ToolDefinition, ToolResult};
use serde::{Deserialize, Serialize};

pub const TOOL_NAME: &str = "websearch";
/// Longest slice of an error body echoed back in an error message.
const ERROR_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    search_depth: &'a str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: Option<String>,
    url: Option<String>,
    content: Option<String>,
}

impl From<SearchHit> for SearchResult {
    fn from(hit: SearchHit) -> Self {
        SearchResult {
            title: hit.title.unwrap_or_default(),
            url: hit.url.unwrap_or_default(),
            snippet: hit.content.unwrap_or_default(),
        }
    }
}

/// Thin client for the search provider's `/search` endpoint.
#[derive(Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    api_key: Option<Secret>,
    endpoint: String,
    search_depth: String,
    max_results: u32,
}

impl SearchClient {
    pub fn new(http: reqwest::Client, config: &SearchConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            search_depth: config.search_depth.clone(),
            max_results: config.max_results,
        }
    }

    /// Run one search. The credential is only required here, at call time.
    pub async fn search(&self, query: &str) -> Result<SearchResults> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            DatawiseError::ApiKeyMissing("search provider (set Tavily_API)".into())
        })?;

        let url = format!("{}/search", self.endpoint);
        let request = SearchRequest {
            query,
            search_depth: &self.search_depth,
            max_results: self.max_results,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| DatawiseError::Http(format!("search request failed ({url}): {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(ERROR_SNIPPET_CHARS).collect();
            tracing::warn!(%status, "search provider returned an error");
            return Err(DatawiseError::Search(format!("HTTP {status}: {snippet}")));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| DatawiseError::Search(format!("unreadable search response: {e}")))?;

        let results: Vec<SearchResult> = body.results.into_iter().map(SearchResult::from).collect();
        tracing::info!(hits = results.len(), "search complete");
        Ok(SearchResults { results })
    }
}

#[derive(Debug, Deserialize)]
struct WebSearchArgs {
    query: String,
}

pub struct WebSearchTool {
    client: SearchClient,
}

impl WebSearchTool {
    pub fn new(client: SearchClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: TOOL_NAME.into(),
            description: "Perform a web search using Tavily API and return structured results.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search query" }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
            returns: serde_json::json!({
                "type": "object",
                "properties": {
                    "results": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string" },
                                "url": { "type": "string" },
                                "snippet": { "type": "string" }
                            },
                            "required": ["title", "url", "snippet"]
                        }
                    }
                },
                "required": ["results"]
            }),
        }
    }

    async fn execute(&self, arguments: &str) -> Result<ToolResult> {
        let args: WebSearchArgs =
            serde_json::from_str(arguments).map_err(|e| DatawiseError::InvalidToolArguments {
                tool: TOOL_NAME.into(),
                reason: e.to_string(),
            })?;

        tracing::info!(query = %args.query, "tool:websearch");
        let results = self.client.search(&args.query).await?;

        Ok(ToolResult {
            output: serde_json::to_string(&results)?,
        })
    }
}
