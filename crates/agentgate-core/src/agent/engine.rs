//! Agent execution engine for agentgate.
//!
//! AgentEngine runs the tool loop: it sends the conversation to the LLM with
//! the gateway tool definitions, executes every requested tool call through
//! the gateway, feeds the results back and repeats until the model answers
//! in plain text. OTel GenAI spans instrument every LLM and tool call.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{Instrument, debug, info_span, warn};

use agentgate_types::error::AgentError;
use agentgate_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, Message, ToolCall, ToolDefinition, Usage,
};
use agentgate_types::session::{Content, Event, Part};

use crate::gateway::Gateway;
use crate::gateway::connector::McpConnector;
use crate::gateway::tools::GatewayTool;
use crate::llm::box_provider::BoxLlmProvider;

use super::context::AgentContext;

/// Outcome of one agent run.
#[derive(Debug, Clone)]
pub struct AgentTurn {
    /// Final model text.
    pub reply: String,
    /// Events produced by the run, in order: tool calls, tool responses and
    /// the final model reply.
    pub events: Vec<Event>,
    /// Token usage summed over every LLM round.
    pub usage: Usage,
}

/// Executes LLM calls and gateway tools on behalf of an agent.
pub struct AgentEngine<C: McpConnector> {
    provider: BoxLlmProvider,
    gateway: Arc<Gateway<C>>,
}

impl<C: McpConnector> AgentEngine<C> {
    pub fn new(provider: BoxLlmProvider, gateway: Arc<Gateway<C>>) -> Self {
        Self { provider, gateway }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn gateway(&self) -> &Gateway<C> {
        &self.gateway
    }

    /// Answer the last message of `context`, calling tools as the model asks.
    ///
    /// Fails with `ToolRoundsExceeded` when the model still requests tools
    /// after `max_tool_rounds` rounds of tool execution. Tool failures are
    /// reported to the model, not to the caller.
    pub async fn run(
        &self,
        context: &AgentContext,
        invocation_id: &str,
    ) -> Result<AgentTurn, AgentError> {
        let author = context.agent_config.name.as_str();
        let max_rounds = context.agent_config.max_tool_rounds;
        let tools = if self.provider.capabilities().tool_calling {
            GatewayTool::definitions()
        } else {
            Vec::new()
        };

        let mut messages = context.build_messages();
        let mut events = Vec::new();
        let mut usage = Usage::default();
        let mut round = 0u32;

        loop {
            let request = Self::build_request(context, messages.clone(), tools.clone());
            let response = self.complete(&request, round).await?;
            usage.add(&response.usage);

            if response.tool_calls.is_empty() {
                events.push(
                    Event::new(invocation_id, author)
                        .with_content(Content::model_text(response.content.clone())),
                );
                return Ok(AgentTurn {
                    reply: response.content,
                    events,
                    usage,
                });
            }

            if round >= max_rounds {
                warn!(rounds = round, "model kept requesting tools, giving up");
                return Err(AgentError::ToolRoundsExceeded(max_rounds));
            }
            round += 1;

            let mut call_parts = Vec::with_capacity(response.tool_calls.len() + 1);
            if !response.content.is_empty() {
                call_parts.push(Part::Text {
                    text: response.content.clone(),
                });
            }
            call_parts.extend(response.tool_calls.iter().map(|call| Part::FunctionCall {
                id: call.id.clone(),
                name: call.name.clone(),
                args: call.arguments.clone(),
            }));
            events.push(Event::new(invocation_id, author).with_content(Content {
                role: "model".to_string(),
                parts: call_parts,
            }));
            messages.push(Message::assistant_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            let mut response_parts = Vec::with_capacity(response.tool_calls.len());
            for call in &response.tool_calls {
                let result = self.execute_tool_call(call).await;
                messages.push(Message::tool_result(call.id.clone(), result.to_string()));
                response_parts.push(Part::FunctionResponse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    response: result,
                });
            }
            events.push(Event::new(invocation_id, author).with_content(Content {
                role: "user".to_string(),
                parts: response_parts,
            }));
        }
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
        round: u32,
    ) -> Result<CompletionResponse, LlmError> {
        let span = info_span!(
            "gen_ai.chat",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            agent.round = round,
        );
        self.provider.complete(request).instrument(span).await
    }

    /// Run one tool call, folding failures into an `{"error": ...}` payload.
    async fn execute_tool_call(&self, call: &ToolCall) -> Value {
        let span = info_span!(
            "gen_ai.execute_tool",
            gen_ai.tool.name = %call.name,
            gen_ai.tool.call.id = %call.id,
        );
        match self
            .gateway
            .invoke(&call.name, &call.arguments)
            .instrument(span)
            .await
        {
            Ok(value) if value.is_object() => value,
            Ok(value) => json!({ "result": value }),
            Err(e) => {
                debug!(tool = %call.name, error = %e, "tool call failed");
                json!({ "error": e.to_string() })
            }
        }
    }

    fn build_request(
        context: &AgentContext,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
    ) -> CompletionRequest {
        CompletionRequest {
            model: context.agent_config.model.clone(),
            messages,
            system: Some(context.system_prompt.clone()),
            max_tokens: context.agent_config.max_tokens,
            temperature: context.agent_config.temperature,
            tools,
        }
    }
}
