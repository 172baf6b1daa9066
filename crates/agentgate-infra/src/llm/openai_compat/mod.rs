//! OpenAI-compatible LLM provider implementation.
//!
//! A single [`OpenAiCompatibleProvider`] serves OpenAI and any gateway that
//! speaks the chat completions protocol, selected by base URL.
//!
//! Uses [`async_openai`] for type-safe request/response handling. Tool
//! definitions, assistant tool calls and tool results are built from their
//! wire JSON so the mapping stays independent of the crate's type names for
//! those shapes.

pub mod config;

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest, FinishReason,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use agentgate_core::llm::provider::LlmProvider;
use agentgate_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, Message, MessageRole, ProviderCapabilities,
    StopReason, ToolCall, ToolDefinition, Usage,
};

use self::config::OpenAiCompatConfig;

/// Provider for any OpenAI-compatible chat completion API.
///
/// # API Key Security
///
/// Does NOT derive Debug to prevent accidental exposure of the API key
/// stored inside the `async_openai::Client`.
pub struct OpenAiCompatibleProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
    model: String,
    timeout_secs: u64,
    capabilities: ProviderCapabilities,
}

impl OpenAiCompatibleProvider {
    /// Create a provider whose HTTP client enforces `config.timeout_secs`.
    pub fn new(config: OpenAiCompatConfig) -> Result<Self, LlmError> {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.api_key())
            .with_api_base(&config.base_url);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::InvalidRequest(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client: Client::with_config(openai_config).with_http_client(http),
            provider_name: config.provider_name,
            model: config.model,
            timeout_secs: config.timeout_secs,
            capabilities: config.capabilities,
        })
    }

    /// Build a [`CreateChatCompletionRequest`] from a generic [`CompletionRequest`].
    fn build_request(
        &self,
        request: &CompletionRequest,
    ) -> Result<CreateChatCompletionRequest, LlmError> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::new();

        if let Some(ref system) = request.system {
            messages.push(system_message(system));
        }

        for msg in &request.messages {
            let oai_msg = match msg.role {
                MessageRole::System => system_message(&msg.content),
                MessageRole::User => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage {
                        content: ChatCompletionRequestUserMessageContent::Text(
                            msg.content.clone(),
                        ),
                        name: None,
                    },
                ),
                MessageRole::Assistant if msg.tool_calls.is_empty() => {
                    #[allow(deprecated)]
                    ChatCompletionRequestMessage::Assistant(
                        ChatCompletionRequestAssistantMessage {
                            content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                                msg.content.clone(),
                            )),
                            refusal: None,
                            name: None,
                            audio: None,
                            tool_calls: None,
                            function_call: None,
                        },
                    )
                }
                MessageRole::Assistant => from_wire(assistant_tool_calls_wire(msg))?,
                MessageRole::Tool => from_wire(json!({
                    "role": "tool",
                    "tool_call_id": msg.tool_call_id.clone().unwrap_or_default(),
                    "content": msg.content,
                }))?,
            };
            messages.push(oai_msg);
        }

        // Use the model from the request if set, otherwise fall back to config default
        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        let mut req = CreateChatCompletionRequest {
            model,
            messages,
            max_completion_tokens: Some(request.max_tokens),
            temperature: request.temperature.map(|t| t as f32),
            ..Default::default()
        };

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request.tools.iter().map(tool_wire).collect();
            req.tools = Some(from_wire(Value::Array(tools))?);
        }

        Ok(req)
    }
}

fn system_message(text: &str) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
        content: ChatCompletionRequestSystemMessageContent::Text(text.to_string()),
        name: None,
    })
}

fn tool_wire(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

fn assistant_tool_calls_wire(msg: &Message) -> Value {
    let calls: Vec<Value> = msg
        .tool_calls
        .iter()
        .map(|call| {
            json!({
                "id": call.id,
                "type": "function",
                "function": {
                    "name": call.name,
                    "arguments": call.arguments.to_string(),
                }
            })
        })
        .collect();
    let content = if msg.content.is_empty() {
        Value::Null
    } else {
        Value::String(msg.content.clone())
    };
    json!({ "role": "assistant", "content": content, "tool_calls": calls })
}

fn from_wire<T: DeserializeOwned>(value: Value) -> Result<T, LlmError> {
    serde_json::from_value(value)
        .map_err(|e| LlmError::InvalidRequest(format!("cannot encode request: {e}")))
}

/// Read tool calls from their wire JSON (`[{id, function: {name, arguments}}]`).
///
/// Arguments arrive as a JSON string; anything unparsable becomes `{}`.
fn parse_tool_calls(value: &Value) -> Vec<ToolCall> {
    let Some(calls) = value.as_array() else {
        return Vec::new();
    };
    calls
        .iter()
        .filter_map(|call| {
            let function = call.get("function")?;
            let name = function.get("name")?.as_str()?.to_string();
            let arguments = match function.get("arguments") {
                Some(Value::String(raw)) if raw.trim().is_empty() => json!({}),
                Some(Value::String(raw)) => {
                    serde_json::from_str(raw).unwrap_or_else(|_| json!({}))
                }
                Some(other) => other.clone(),
                None => json!({}),
            };
            Some(ToolCall {
                id: call
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                name,
                arguments,
            })
        })
        .collect()
}

// OpenAiCompatibleProvider intentionally does NOT derive Debug to prevent
// accidental exposure of internal state including the API key inside the
// async-openai Client.

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let oai_request = self.build_request(request)?;

        let response = self
            .client
            .chat()
            .create(oai_request)
            .await
            .map_err(|e| map_openai_error(e, self.timeout_secs))?;

        let choice = response.choices.first();

        let content = choice
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        let tool_calls = match choice.and_then(|c| c.message.tool_calls.as_ref()) {
            Some(calls) => {
                let wire = serde_json::to_value(calls)
                    .map_err(|e| LlmError::Deserialization(e.to_string()))?;
                parse_tool_calls(&wire)
            }
            None => Vec::new(),
        };

        let stop_reason = if !tool_calls.is_empty() {
            StopReason::ToolUse
        } else {
            choice
                .and_then(|c| c.finish_reason.as_ref())
                .map(|fr| match fr {
                    FinishReason::Stop => StopReason::EndTurn,
                    FinishReason::Length => StopReason::MaxTokens,
                    FinishReason::ToolCalls => StopReason::ToolUse,
                    FinishReason::ContentFilter => StopReason::EndTurn,
                    FinishReason::FunctionCall => StopReason::ToolUse,
                })
                .unwrap_or(StopReason::EndTurn)
        };

        let usage = response
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: response.id,
            content,
            model: response.model,
            stop_reason,
            usage,
            tool_calls,
        })
    }
}

/// Map an `async_openai::error::OpenAIError` to an [`LlmError`].
fn map_openai_error(err: async_openai::error::OpenAIError, timeout_secs: u64) -> LlmError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "authentication_error"
                || error_type == "authentication_error"
                || api_err.message.contains("Incorrect API key")
                || api_err.message.contains("Invalid API key")
            {
                LlmError::AuthenticationFailed
            } else if code == "rate_limit_exceeded" || error_type == "rate_limit_error" {
                LlmError::RateLimited {
                    retry_after_ms: None,
                }
            } else if code == "context_length_exceeded"
                || api_err.message.contains("maximum context length")
            {
                LlmError::ContextLengthExceeded {
                    max: 0,
                    requested: 0,
                }
            } else {
                LlmError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => {
            if reqwest_err.is_timeout() {
                return LlmError::Timeout(timeout_secs);
            }
            match reqwest_err.status().map(|s| s.as_u16()) {
                Some(401) => LlmError::AuthenticationFailed,
                Some(429) => LlmError::RateLimited {
                    retry_after_ms: None,
                },
                _ => LlmError::Provider {
                    message: err.to_string(),
                },
            }
        }
        OpenAIError::JSONDeserialize(_, content) => {
            LlmError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg.clone()),
        _ => LlmError::Provider {
            message: err.to_string(),
        },
    }
}
