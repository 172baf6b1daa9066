//! McpConnector trait definition.
//!
//! One connector talks to every backend server; each call names the server
//! endpoint. Implementations open a fresh MCP session per call.

use agentgate_types::error::GatewayError;
use agentgate_types::gateway::{CallToolResult, InitializeResult, McpTool};

/// Client side of the MCP calls the gateway issues.
///
/// The HTTP implementation lives in agentgate-infra (`HttpMcpConnector`).
pub trait McpConnector: Send + Sync {
    /// Run the `initialize` handshake and return the server's answer.
    fn initialize(
        &self,
        endpoint: &str,
    ) -> impl std::future::Future<Output = Result<InitializeResult, GatewayError>> + Send;

    /// All tools the server advertises (every `tools/list` page).
    fn list_tools(
        &self,
        endpoint: &str,
    ) -> impl std::future::Future<Output = Result<Vec<McpTool>, GatewayError>> + Send;

    /// Invoke one tool with a JSON arguments object.
    fn call_tool(
        &self,
        endpoint: &str,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> impl std::future::Future<Output = Result<CallToolResult, GatewayError>> + Send;
}
