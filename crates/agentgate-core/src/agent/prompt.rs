//! System prompt builder for agentgate agents.
//!
//! Assembles the system prompt from the agent instruction, the session's
//! current state and keyword-recalled memories, using XML tag boundaries
//! for clear section delineation.
//!
//! `{key}` in the instruction is replaced by the session state value under
//! `key` (`app:`, `user:` and `temp:` prefixes allowed); `{key?}` becomes
//! empty when the key is unset. Braces around anything that is not a state
//! name are left alone, as is a required key with no value.

use agentgate_types::agent::AgentConfig;
use agentgate_types::memory::MemoryEntry;
use agentgate_types::session::StateMap;
use serde_json::Value;

/// Used when no instruction file is present.
pub const DEFAULT_INSTRUCTION: &str = "\
You are a helpful assistant with access to a gateway of MCP tool servers.
Use list_mcp_servers to discover the available servers, list_mcp_tools and \
describe_mcp_tool to find the right tool, then execute_mcp_tool to run it.
Never invent tool names or arguments: describe a tool before executing it.
When the task was delegated by a master agent, call \
send_response_to_master_agent with your final answer.";

/// Builds a system prompt from instruction text, session state and memories.
///
/// Layout:
/// ```text
/// <identity>Name: ... Model: ...</identity>
/// <instructions>{instruction}</instructions>
/// <session_state>{"key": value, ...}</session_state>
/// <memory>Relevant excerpts from earlier conversations: ...</memory>
/// ```
pub struct SystemPromptBuilder;

impl SystemPromptBuilder {
    pub fn build(
        config: &AgentConfig,
        instruction: &str,
        state: &StateMap,
        memories: &[MemoryEntry],
    ) -> String {
        let mut sections = Vec::with_capacity(4);

        sections.push(format!(
            "<identity>\nName: {}\nModel: {}\n</identity>",
            config.name, config.model
        ));

        let instruction = if instruction.trim().is_empty() {
            DEFAULT_INSTRUCTION
        } else {
            instruction.trim()
        };
        let instruction = inject_state(instruction, state);
        sections.push(format!("<instructions>\n{instruction}\n</instructions>"));

        if !state.is_empty() {
            let rendered = serde_json::to_string_pretty(state).unwrap_or_default();
            sections.push(format!("<session_state>\n{rendered}\n</session_state>"));
        }

        if !memories.is_empty() {
            let lines: Vec<String> = memories.iter().map(Self::format_memory).collect();
            sections.push(format!(
                "<memory>\nRelevant excerpts from earlier conversations:\n{}\n</memory>",
                lines.join("\n")
            ));
        }

        sections.join("\n\n")
    }

    fn format_memory(entry: &MemoryEntry) -> String {
        format!("- [{}] {}: {}", entry.timestamp, entry.author, entry.text())
    }
}

/// Fill `{key}` and `{key?}` placeholders in `template` from `state`.
pub fn inject_state(template: &str, state: &StateMap) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find(['{', '}']) else {
            out.push_str(&rest[open..]);
            return out;
        };
        if after.as_bytes()[close] == b'{' {
            // Nested open brace: the outer one is literal.
            out.push('{');
            rest = after;
            continue;
        }
        let inner = &after[..close];
        match resolve_placeholder(inner, state) {
            Some(value) => out.push_str(&value),
            None => {
                out.push('{');
                out.push_str(inner);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

fn resolve_placeholder(inner: &str, state: &StateMap) -> Option<String> {
    let inner = inner.trim();
    let (key, optional) = match inner.strip_suffix('?') {
        Some(key) => (key, true),
        None => (inner, false),
    };
    if !is_state_name(key) {
        return None;
    }
    match state.get(key) {
        Some(Value::String(text)) => Some(text.clone()),
        Some(other) => Some(other.to_string()),
        None if optional => Some(String::new()),
        None => {
            tracing::warn!(key, "instruction placeholder has no state value");
            None
        }
    }
}

fn is_state_name(key: &str) -> bool {
    let bare = ["app:", "user:", "temp:"]
        .iter()
        .find_map(|prefix| key.strip_prefix(prefix))
        .unwrap_or(key);
    let mut chars = bare.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
