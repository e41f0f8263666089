//! # Datawise Agent
//!
//! Single-shot question dispatcher. Each question starts a fresh conversation
//! of `[instructions, question]`, which is sent to the decision service along
//! with every registered tool. Tool calls are executed in the order given and
//! their output is fed back until the service answers with plain text.
//!
//! ```text
//! idle -> awaiting-decision -> (tool-invocation -> awaiting-decision)* -> answered
//! ```
//!
//! The dispatcher does no routing of its own and does not validate arguments;
//! tools reject malformed arguments themselves.

use std::time::Duration;

use datawise_core::config::{AgentConfig, AppConfig};
use datawise_core::error::{DatawiseError, Result};
use datawise_core::traits::{GenerateParams, Provider};
use datawise_core::types::{Message, ToolCall, ToolDefinition, Usage};
use datawise_tools::ToolRegistry;
use serde::Serialize;

/// One tool call made while answering a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInvocation {
    pub name: String,
    /// Raw JSON argument text as produced by the decision service.
    pub arguments: String,
}

/// Outcome of [`Agent::run`].
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub final_output: String,
    pub invocations: Vec<ToolInvocation>,
    /// Number of decision-service round-trips.
    pub turns: usize,
    /// Token usage summed over every turn that reported it.
    pub usage: Usage,
}

impl RunResult {
    pub fn invoked(&self, tool: &str) -> bool {
        self.invocations.iter().any(|i| i.name == tool)
    }
}

pub struct Agent {
    provider: Box<dyn Provider>,
    tools: ToolRegistry,
    tool_defs: Vec<ToolDefinition>,
    params: GenerateParams,
    config: AgentConfig,
}

impl Agent {
    pub fn new(
        provider: Box<dyn Provider>,
        tools: ToolRegistry,
        params: GenerateParams,
        config: AgentConfig,
    ) -> Self {
        let tool_defs = tools.list();
        Self {
            provider,
            tools,
            tool_defs,
            params,
            config,
        }
    }

    /// Wire the OpenAI-compatible provider and the default tool set from `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let provider = datawise_providers::create_provider(&config.llm)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm.timeout_secs))
            .build()
            .map_err(|e| DatawiseError::Http(format!("HTTP client init failed: {e}")))?;
        let tools = ToolRegistry::from_config(config, http);

        tracing::info!(
            agent = %config.agent.name,
            provider = provider.name(),
            model = %config.llm.model,
            tools = tools.len(),
            "agent ready"
        );

        Ok(Self::new(
            provider,
            tools,
            GenerateParams {
                model: config.llm.model.clone(),
                temperature: config.llm.temperature,
                max_tokens: config.llm.max_tokens,
            },
            config.agent.clone(),
        ))
    }

    /// Answer one question. No state survives between calls.
    pub async fn run(&self, question: &str) -> Result<RunResult> {
        let mut conversation = vec![
            Message::system(&self.config.instructions),
            Message::user(question),
        ];
        let mut invocations = Vec::new();
        let mut usage = Usage::default();

        for turn in 1..=self.config.max_turns {
            tracing::debug!(turn, messages = conversation.len(), "awaiting decision");
            let response = self
                .provider
                .chat(&conversation, &self.tool_defs, &self.params)
                .await?;

            tracing::debug!(
                turn,
                finish_reason = response.finish_reason.as_deref().unwrap_or("-"),
                tokens = response.usage.map(|u| u.total_tokens),
                "decision received"
            );
            if let Some(turn_usage) = &response.usage {
                usage.add(turn_usage);
            }

            if response.tool_calls.is_empty() {
                let final_output = response.content.unwrap_or_default();
                tracing::info!(
                    turns = turn,
                    tools_used = invocations.len(),
                    total_tokens = usage.total_tokens,
                    "answered"
                );
                return Ok(RunResult {
                    final_output,
                    invocations,
                    turns: turn,
                    usage,
                });
            }

            tracing::info!(turn, calls = response.tool_calls.len(), "tool round");

            let mut results = Vec::with_capacity(response.tool_calls.len());
            for tc in &response.tool_calls {
                let output = self.invoke(tc).await?;
                invocations.push(ToolInvocation {
                    name: tc.function.name.clone(),
                    arguments: tc.function.arguments.clone(),
                });
                results.push(Message::tool(output, &tc.id));
            }

            conversation.push(Message::assistant_tool_calls(
                response.content.unwrap_or_default(),
                response.tool_calls,
            ));
            conversation.extend(results);
        }

        tracing::warn!(max_turns = self.config.max_turns, "no final answer");
        Err(DatawiseError::MaxTurnsExceeded(self.config.max_turns))
    }

    async fn invoke(&self, tc: &ToolCall) -> Result<String> {
        let name = &tc.function.name;
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| DatawiseError::ToolNotFound(name.clone()))?;

        tracing::info!(
            "  → {} ({})",
            name,
            preview(&tc.function.arguments, 100)
        );

        let result = tool.execute(&tc.function.arguments).await?;
        Ok(match self.config.max_tool_output_chars {
            Some(limit) => truncate_output(result.output, limit),
            None => result.output,
        })
    }
}

fn preview(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn truncate_output(output: String, limit: usize) -> String {
    let total = output.chars().count();
    if total <= limit {
        return output;
    }
    format!(
        "{}...\n[truncated, {total} total chars]",
        preview(&output, limit)
    )
}
