//! Agent conversation context for agentgate.
//!
//! AgentContext holds everything one agent run needs: configuration, the
//! assembled system prompt and the conversation history rebuilt from the
//! session's events.

use std::collections::HashSet;

use agentgate_types::agent::AgentConfig;
use agentgate_types::llm::{Message, MessageRole, ToolCall};
use agentgate_types::memory::MemoryEntry;
use agentgate_types::session::{Event, Part, Session};

use super::prompt::SystemPromptBuilder;

/// Author name of events written on behalf of the caller.
pub const USER_AUTHOR: &str = "user";

#[derive(Debug, Clone)]
pub struct AgentContext {
    pub agent_config: AgentConfig,
    pub system_prompt: String,
    /// Prior turns, ending with the message being answered.
    pub conversation_history: Vec<Message>,
    pub recalled_memories: Vec<MemoryEntry>,
}

impl AgentContext {
    /// Build the context for answering the latest event of `session`.
    pub fn new(
        config: AgentConfig,
        instruction: &str,
        session: &Session,
        recalled_memories: Vec<MemoryEntry>,
    ) -> Self {
        let system_prompt =
            SystemPromptBuilder::build(&config, instruction, &session.state, &recalled_memories);
        Self {
            conversation_history: history_from_events(&session.events),
            agent_config: config,
            system_prompt,
            recalled_memories,
        }
    }

    /// The message list for an LLM request.
    ///
    /// The system prompt is sent separately (not as a message).
    pub fn build_messages(&self) -> Vec<Message> {
        self.conversation_history.clone()
    }
}

/// Rebuild chat messages from session events.
///
/// Function calls become assistant tool calls, function responses become
/// tool messages and text is attributed by author. Tool calls without a
/// matching response (a run that died mid-loop) are dropped along with
/// responses that answer no call, so the provider never sees a dangling pair.
pub fn history_from_events(events: &[Event]) -> Vec<Message> {
    let mut messages = Vec::new();

    for event in events {
        let Some(content) = &event.content else {
            continue;
        };

        let mut texts = Vec::new();
        let mut calls = Vec::new();
        let mut results = Vec::new();
        for part in &content.parts {
            match part {
                Part::Text { text } if !text.is_empty() => texts.push(text.as_str()),
                Part::Text { .. } => {}
                Part::FunctionCall { id, name, args } => calls.push(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    arguments: args.clone(),
                }),
                Part::FunctionResponse { id, response, .. } => {
                    results.push(Message::tool_result(id.clone(), response.to_string()));
                }
            }
        }

        let text = texts.join("\n");
        if !calls.is_empty() {
            messages.push(Message::assistant_tool_calls(text, calls));
        } else if !results.is_empty() {
            messages.extend(results);
        } else if !text.is_empty() {
            if event.author == USER_AUTHOR {
                messages.push(Message::user(text));
            } else {
                messages.push(Message::assistant(text));
            }
        }
    }

    drop_unpaired_tool_messages(messages)
}

fn drop_unpaired_tool_messages(messages: Vec<Message>) -> Vec<Message> {
    let answered: HashSet<String> = messages
        .iter()
        .filter(|m| m.role == MessageRole::Tool)
        .filter_map(|m| m.tool_call_id.clone())
        .collect();
    let called: HashSet<String> = messages
        .iter()
        .flat_map(|m| m.tool_calls.iter().map(|c| c.id.clone()))
        .collect();

    messages
        .into_iter()
        .filter_map(|mut m| match m.role {
            MessageRole::Tool => m
                .tool_call_id
                .as_ref()
                .is_some_and(|id| called.contains(id))
                .then_some(m),
            MessageRole::Assistant if !m.tool_calls.is_empty() => {
                m.tool_calls.retain(|c| answered.contains(&c.id));
                (!m.tool_calls.is_empty() || !m.content.is_empty()).then_some(m)
            }
            _ => Some(m),
        })
        .collect()
}
