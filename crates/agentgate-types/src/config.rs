//! Process configuration types for agentgate.
//!
//! `Settings` is assembled once at startup from `SECTION__FIELD` environment
//! variables (see `agentgate_infra::config`) and then handed to every
//! component by reference. It is never mutated after load.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use secrecy::SecretString;
use serde::{Deserialize, Serialize, Serializer};

/// Top-level configuration record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub gateway: GatewaySettings,
    pub agent: AgentSettings,
    pub app: AppSettings,
    #[serde(default)]
    pub store: StoreSettings,
    /// Present only when `MASTER_AGENT__BASE_URL` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_agent: Option<MasterAgentSettings>,
}

impl Settings {
    /// Store namespace shared by sessions and memory: `{app}_{agent}`.
    pub fn app_name(&self) -> String {
        format!("{}_{}", self.app.name, self.agent.name)
    }
}

/// MCP gateway: the named backend tool servers the agent may call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    pub name: String,
    /// Only accept `application/json` replies from backend servers.
    #[serde(default)]
    pub json_response: bool,
    /// Server name to streamable-HTTP endpoint URL.
    pub backend_servers: BTreeMap<String, String>,
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,
}

/// The agent's identity and the model it talks to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    pub name: String,
    /// Public URL announced to the master agent on registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_instruction_path")]
    pub instruction_path: String,
    #[serde(default = "default_card_path")]
    pub card_path: String,
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    pub model: ModelSettings,
}

/// OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    pub name: String,
    pub base_url: String,
    #[serde(serialize_with = "serialize_redacted")]
    pub api_key: SecretString,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Upper bound on one agent invocation behind `POST /chat`.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Which store keeps sessions and memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    /// Process-local maps; lost on restart.
    Memory,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Redis => write!(f, "redis"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("invalid store backend: '{other}'")),
        }
    }
}

/// Connection settings for the session/memory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub host: String,
    pub port: u16,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_redacted_opt"
    )]
    pub password: Option<SecretString>,
    pub db: i64,
    pub timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redis,
            host: "localhost".to_string(),
            port: 6382,
            password: None,
            db: 0,
            timeout_secs: 5,
        }
    }
}

/// The orchestrating agent this agent registers with at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterAgentSettings {
    pub base_url: String,
}

fn serialize_redacted<S: Serializer>(_: &SecretString, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str("[REDACTED]")
}

fn serialize_redacted_opt<S: Serializer>(
    value: &Option<SecretString>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(_) => s.serialize_str("[REDACTED]"),
        None => s.serialize_none(),
    }
}

pub fn default_gateway_timeout_secs() -> u64 {
    30
}
pub fn default_instruction_path() -> String {
    "instruction.txt".to_string()
}
pub fn default_card_path() -> String {
    "agent-card.json".to_string()
}
pub fn default_max_tool_rounds() -> u32 {
    10
}
pub fn default_max_tokens() -> u32 {
    4096
}
pub fn default_model_timeout_secs() -> u64 {
    60
}
pub fn default_request_timeout_secs() -> u64 {
    120
}
