//! OpenAI-compatible chat-completions provider.
//!
//! Sends the conversation plus the capability list in the standard
//! `tools: [{type: "function", function: {...}}]` shape and reads back either
//! `message.tool_calls` or `message.content`. No retries: any transport or
//! API failure is returned to the caller as-is.

use std::time::Duration;

use async_trait::async_trait;
use datawise_core::config::{LlmConfig, Secret};
use datawise_core::error::{DatawiseError, Result};
use datawise_core::traits::provider::{GenerateParams, Provider};
use datawise_core::types::{
    FunctionCall, Message, ProviderResponse, ToolCall, ToolDefinition, Usage,
};
use serde_json::{Value, json};

const CHAT_PATH: &str = "/chat/completions";
/// Longest slice of an error body echoed back in an error message.
const ERROR_SNIPPET_CHARS: usize = 500;

/// A provider that works with any OpenAI-compatible API.
pub struct OpenAiCompatibleProvider {
    name: String,
    api_key: Secret,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    /// Build from resolved configuration. Fails if endpoint, key or model is missing.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        config.ensure_complete()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DatawiseError::Http(format!("HTTP client init failed: {e}")))?;
        Ok(Self::with_client(client, &config.base_url, config.api_key.clone()))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, api_key: Secret) -> Self {
        Self {
            name: "openai-compatible".to_string(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn request_body(
        messages: &[Message],
        tools: &[ToolDefinition],
        params: &GenerateParams,
    ) -> Result<Value> {
        let mut body = json!({
            "model": params.model,
            "messages": serde_json::to_value(messages)?,
        });

        if let Some(temperature) = params.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = params.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        if !tools.is_empty() {
            let tool_defs: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tool_defs);
        }

        Ok(body)
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        params: &GenerateParams,
    ) -> Result<ProviderResponse> {
        if self.api_key.is_empty() {
            return Err(DatawiseError::ApiKeyMissing(self.name.clone()));
        }

        let body = Self::request_body(messages, tools, params)?;
        let url = format!("{}{}", self.base_url, CHAT_PATH);

        tracing::debug!(
            model = %params.model,
            messages = messages.len(),
            tools = tools.len(),
            "chat request"
        );

        let resp = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                DatawiseError::Http(format!("{} connection failed ({}): {}", self.name, url, e))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(ERROR_SNIPPET_CHARS).collect();
            tracing::warn!(%status, "decision service returned an error");
            return Err(DatawiseError::Provider(format!(
                "{} API error {}: {}",
                self.name, status, snippet
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| DatawiseError::Http(e.to_string()))?;

        parse_response(&json)
    }
}

/// Read the first choice of a chat-completions response.
fn parse_response(json: &Value) -> Result<ProviderResponse> {
    if let Some(err) = json.get("error").filter(|e| !e.is_null()) {
        let message = err["message"].as_str().unwrap_or("unknown error");
        return Err(DatawiseError::Provider(format!("API error: {message}")));
    }

    let choice = json["choices"]
        .get(0)
        .ok_or_else(|| DatawiseError::Provider("No choices in response".into()))?;

    let content = choice["message"]["content"].as_str().map(String::from);

    let tool_calls = choice["message"]["tool_calls"]
        .as_array()
        .map(|calls| calls.iter().map(parse_tool_call).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();

    let usage = json["usage"].as_object().map(|u| Usage {
        prompt_tokens: u.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        completion_tokens: u
            .get("completion_tokens")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32,
        total_tokens: u.get("total_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
    });

    Ok(ProviderResponse {
        content,
        tool_calls,
        finish_reason: choice["finish_reason"].as_str().map(String::from),
        usage,
    })
}

/// A call without a function name cannot be dispatched and fails the reply.
fn parse_tool_call(t: &Value) -> Result<ToolCall> {
    let name = t["function"]["name"]
        .as_str()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| DatawiseError::Provider("tool call without function name".into()))?;

    Ok(ToolCall {
        id: t["id"].as_str().unwrap_or("").to_string(),
        r#type: "function".to_string(),
        function: FunctionCall {
            name: name.to_string(),
            arguments: t["function"]["arguments"]
                .as_str()
                .unwrap_or("{}")
                .to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(uri: &str) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::with_client(
            reqwest::Client::new(),
            &format!("{uri}/v1/"),
            Secret::new("sk-test"),
        )
    }

    fn params() -> GenerateParams {
        GenerateParams {
            model: "gpt-4o-mini".into(),
            temperature: None,
            max_tokens: None,
        }
    }

    fn websearch_def() -> ToolDefinition {
        ToolDefinition {
            name: "websearch".into(),
            description: "Perform a web search".into(),
            parameters: json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            }),
            returns: json!({ "type": "object" }),
        }
    }

    #[test]
    fn test_request_body_shape() {
        let body = OpenAiCompatibleProvider::request_body(
            &[Message::system("be brief"), Message::user("hi")],
            &[websearch_def()],
            &GenerateParams {
                temperature: Some(0.3),
                ..params()
            },
        )
        .unwrap();

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "websearch");
        assert!(body["tools"][0]["function"].get("returns").is_none());
        assert!(body.get("max_tokens").is_none());
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_request_body_omits_empty_tools() {
        let body =
            OpenAiCompatibleProvider::request_body(&[Message::user("hi")], &[], &params()).unwrap();
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_from_config_requires_complete_config() {
        let err = OpenAiCompatibleProvider::from_config(&LlmConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, DatawiseError::Config(_)));
    }

    #[tokio::test]
    async fn test_chat_parses_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {
                                "name": "websearch",
                                "arguments": "{\"query\":\"what is cancer\"}"
                            }
                        }]
                    },
                    "finish_reason": "tool_calls"
                }],
                "usage": { "prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17 }
            })))
            .mount(&server)
            .await;

        let response = provider(&server.uri())
            .chat(&[Message::user("what is cancer")], &[websearch_def()], &params())
            .await
            .unwrap();

        assert!(response.content.is_none());
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].id, "call_1");
        assert_eq!(response.tool_calls[0].function.name, "websearch");
        assert_eq!(response.finish_reason.as_deref(), Some("tool_calls"));
        assert_eq!(response.usage.unwrap().total_tokens, 17);
    }

    #[tokio::test]
    async fn test_chat_parses_final_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": { "role": "assistant", "content": "The average age is 54.4." },
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let response = provider(&server.uri())
            .chat(&[Message::user("avg age?")], &[], &params())
            .await
            .unwrap();

        assert_eq!(response.content.as_deref(), Some("The average age is 54.4."));
        assert!(response.tool_calls.is_empty());
        assert!(response.usage.is_none());
    }

    #[tokio::test]
    async fn test_chat_http_error_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .expect(1)
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .chat(&[Message::user("hi")], &[], &params())
            .await
            .unwrap_err();

        match err {
            DatawiseError::Provider(msg) => {
                assert!(msg.contains("401"), "got: {msg}");
                assert!(msg.contains("invalid api key"), "got: {msg}");
            }
            other => panic!("expected Provider error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_chat_without_choices_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .chat(&[Message::user("hi")], &[], &params())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No choices"));
    }

    #[tokio::test]
    async fn test_chat_unreachable_is_http_error() {
        let p = provider("http://127.0.0.1:9");
        let err = p
            .chat(&[Message::user("hi")], &[], &params())
            .await
            .unwrap_err();
        assert!(matches!(err, DatawiseError::Http(_)));
    }

    #[test]
    fn test_tool_call_without_name_fails() {
        let err = parse_response(&json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{ "id": "c1", "function": { "arguments": "{}" } }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap_err();
        assert!(matches!(err, DatawiseError::Provider(_)));
        assert!(err.to_string().contains("without function name"));
    }

    #[test]
    fn test_error_object_in_success_body() {
        let err = parse_response(&json!({ "error": { "message": "model not found" } }))
            .unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }
}
