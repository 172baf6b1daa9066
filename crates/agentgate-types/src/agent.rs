//! Agent configuration types for agentgate.

use serde::{Deserialize, Serialize};

use crate::config::Settings;

/// Parameters for one agent run, derived from `Settings` at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent name; also the author of model events.
    pub name: String,
    pub model: String,
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    pub max_tool_rounds: u32,
}

impl From<&Settings> for AgentConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            name: settings.agent.name.clone(),
            model: settings.agent.model.name.clone(),
            max_tokens: settings.agent.model.max_tokens,
            temperature: settings.agent.model.temperature,
            max_tool_rounds: settings.agent.max_tool_rounds,
        }
    }
}
