//! Core agent loop implementation.
//!
//! One turn submits the session to the model, runs every tool invocation in
//! the reply, appends the results and resubmits, until the model answers
//! without invocations or the round cap is hit.

use super::normalize::normalize;
use super::AgentError;
use crate::catalog::Catalog;
use crate::llm::{ChatModel, ChatRequest, LlmError};
use crate::mcp::ToolSurface;
use crate::session::{Message, Session, ToolCall};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, debug_span, warn, Instrument};
use uuid::Uuid;

/// Default maximum model rounds per turn
pub const DEFAULT_MAX_ITERATIONS: usize = 12;

/// Configuration for the agent loop
#[derive(Debug, Clone)]
pub struct AgentLoopConfig {
    /// Model id sent with every request
    pub model: String,
    /// Maximum model submissions per turn
    pub max_iterations: usize,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            model: "gpt-5".to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl AgentLoopConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }
}

/// Token and tool usage for one turn
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TurnStats {
    pub rounds: usize,
    pub tool_uses: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Result of a single agent turn
#[derive(Debug, Default, Clone)]
pub struct TurnResult {
    /// Content of the final assistant message (may be empty)
    pub response: String,
    pub stats: TurnStats,
}

/// Observation points for a running turn. All methods default to no-ops.
pub trait AgentHooks: Send + Sync {
    /// Called before a tool runs, with the parsed arguments.
    fn on_tool_call(&self, _name: &str, _args: &Value) {}

    /// Called with the normalized tool message body.
    fn on_tool_result(&self, _name: &str, _body: &str) {}

    /// Called for every non-empty assistant content, including content
    /// that accompanies tool invocations.
    fn on_content(&self, _content: &str) {}
}

/// Hooks that observe nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl AgentHooks for NoopHooks {}

enum LoopState {
    AwaitingModel,
    ExecutingTools(Vec<ToolCall>),
    Terminal(String),
}

/// A model and a tool surface bound together for one session.
pub struct Agent {
    model: Arc<dyn ChatModel>,
    tools: Arc<dyn ToolSurface>,
    catalog: Catalog,
    config: AgentLoopConfig,
}

impl Agent {
    /// Fetch the tool catalog once and bind it for the session.
    pub async fn start(
        model: Arc<dyn ChatModel>,
        tools: Arc<dyn ToolSurface>,
        config: AgentLoopConfig,
    ) -> Result<Self, AgentError> {
        let catalog = Catalog::fetch(tools.as_ref()).await?;
        debug!(tools = catalog.len(), "tool catalog loaded");
        Ok(Self::with_catalog(model, tools, catalog, config))
    }

    pub fn with_catalog(
        model: Arc<dyn ChatModel>,
        tools: Arc<dyn ToolSurface>,
        catalog: Catalog,
        config: AgentLoopConfig,
    ) -> Self {
        Self {
            model,
            tools,
            catalog,
            config,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &AgentLoopConfig {
        &self.config
    }

    /// Append a user message and resolve it.
    pub async fn run_turn(
        &self,
        session: &mut Session,
        input: &str,
        hooks: &dyn AgentHooks,
    ) -> Result<TurnResult, AgentError> {
        session.push_user(input);
        let turn_id = Uuid::new_v4();
        self.resolve(session, hooks)
            .instrument(debug_span!("turn", id = %turn_id))
            .await
    }

    /// Drive the session until the model answers without tool invocations.
    pub async fn resolve(
        &self,
        session: &mut Session,
        hooks: &dyn AgentHooks,
    ) -> Result<TurnResult, AgentError> {
        let mut stats = TurnStats::default();
        let mut state = LoopState::AwaitingModel;

        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    if stats.rounds >= self.config.max_iterations {
                        warn!(rounds = stats.rounds, "round cap reached");
                        return Err(AgentError::LoopBound(self.config.max_iterations));
                    }
                    stats.rounds += 1;
                    debug!(round = stats.rounds, messages = session.len(), "submitting");

                    let response = self.model.chat(&self.request(session)).await?;
                    if let Some(usage) = &response.usage {
                        stats.input_tokens += usage.prompt_tokens;
                        stats.output_tokens += usage.completion_tokens;
                    }
                    let choice = response
                        .choices
                        .into_iter()
                        .next()
                        .ok_or(LlmError::EmptyResponse)?;
                    if choice.finish_reason.as_deref() == Some("length") {
                        warn!("model response truncated (max tokens reached)");
                    }

                    let content = choice.message.content.unwrap_or_default();
                    let calls = choice.message.tool_calls.unwrap_or_default();
                    if !content.is_empty() {
                        hooks.on_content(&content);
                    }
                    session.append(Message::assistant(content.clone(), calls.clone()));

                    if calls.is_empty() {
                        LoopState::Terminal(content)
                    } else {
                        LoopState::ExecutingTools(calls)
                    }
                }

                LoopState::ExecutingTools(calls) => {
                    for call in calls {
                        stats.tool_uses += 1;
                        let body = self.execute(&call, hooks).await;
                        session.append(Message::tool(call.id, body));
                    }
                    LoopState::AwaitingModel
                }

                LoopState::Terminal(response) => {
                    debug!(?stats, "turn complete");
                    return Ok(TurnResult { response, stats });
                }
            };
        }
    }

    fn request(&self, session: &Session) -> ChatRequest {
        let has_tools = !self.catalog.is_empty();
        ChatRequest {
            model: self.config.model.clone(),
            messages: session.snapshot().to_vec(),
            tools: has_tools.then(|| self.catalog.to_openai()),
            tool_choice: has_tools.then(|| "auto".to_string()),
        }
    }

    /// Run one invocation. Failures become the tool message body.
    async fn execute(&self, call: &ToolCall, hooks: &dyn AgentHooks) -> String {
        let name = &call.function.name;
        let args = parse_arguments(name, &call.function.arguments);
        debug!(tool = %name, id = %call.id, %args, "tool call");
        hooks.on_tool_call(name, &args);

        let body = match self.tools.call_tool(name, args).await {
            Ok(result) => normalize(&result),
            Err(e) => {
                debug!(tool = %name, kind = e.kind(), error = %e, "tool failed");
                e.to_string()
            }
        };
        hooks.on_tool_result(name, &body);
        body
    }
}

/// Parse model-emitted arguments. Anything unparseable becomes `{}`.
fn parse_arguments(tool: &str, raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(tool, error = %e, raw, "malformed tool arguments, using {{}}");
        json!({})
    })
}
