use thiserror::Error;

use crate::llm::LlmError;

/// Errors raised while assembling `Settings` from the environment.
///
/// Every variant names the offending variable so startup failures are
/// actionable from the log line alone.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(String),

    #[error("invalid value for {var}: {message}")]
    Invalid { var: String, message: String },

    #[error("failed to read env file: {0}")]
    EnvFile(String),
}

/// Errors from repository operations (used by trait definitions in agentgate-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("store connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("store operation timed out after {0}s")]
    Timeout(u64),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors from the MCP gateway and its backend servers.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("unknown MCP server '{0}'")]
    UnknownServer(String),

    #[error("tool '{tool}' not found on server '{server}'")]
    ToolNotFound { server: String, tool: String },

    #[error("unknown gateway tool '{0}'")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("MCP server returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("MCP request timed out after {0}s")]
    Timeout(u64),
}

/// Errors surfaced by an agent invocation.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("session '{0}' not found")]
    SessionNotFound(String),

    #[error("tool loop exceeded {0} rounds")]
    ToolRoundsExceeded(u32),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
