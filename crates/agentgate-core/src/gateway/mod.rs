//! MCP gateway for agentgate.
//!
//! The gateway maps server names from configuration to endpoints and exposes
//! discovery and execution over them. `tools` turns these operations into
//! function tools the model can call.

pub mod connector;
pub mod tools;

use std::collections::BTreeMap;

use agentgate_types::error::GatewayError;
use agentgate_types::gateway::{CallToolResult, McpTool, ServerMetadata, ToolSummary};
use serde_json::{Value, json};

use self::connector::McpConnector;

/// Named MCP backend servers behind one connector.
pub struct Gateway<C: McpConnector> {
    name: String,
    servers: BTreeMap<String, String>,
    connector: C,
}

impl<C: McpConnector> Gateway<C> {
    pub fn new(name: impl Into<String>, servers: BTreeMap<String, String>, connector: C) -> Self {
        Self {
            name: name.into(),
            servers,
            connector,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured server names in sorted order.
    pub fn server_names(&self) -> impl Iterator<Item = &str> {
        self.servers.keys().map(String::as_str)
    }

    fn endpoint(&self, server_name: &str) -> Result<&str, GatewayError> {
        self.servers
            .get(server_name)
            .map(String::as_str)
            .ok_or_else(|| GatewayError::UnknownServer(server_name.to_string()))
    }

    /// Name and description of every backend server.
    ///
    /// Servers are contacted one after another; the first failure aborts.
    pub async fn list_servers(&self) -> Result<Vec<ServerMetadata>, GatewayError> {
        let mut servers = Vec::with_capacity(self.servers.len());
        for (name, endpoint) in &self.servers {
            let init = self.connector.initialize(endpoint).await?;
            servers.push(ServerMetadata {
                server_name: name.clone(),
                server_description: init.description(),
            });
        }
        Ok(servers)
    }

    pub async fn list_tools(&self, server_name: &str) -> Result<Vec<ToolSummary>, GatewayError> {
        let endpoint = self.endpoint(server_name)?;
        let tools = self.connector.list_tools(endpoint).await?;
        Ok(tools.iter().map(ToolSummary::from).collect())
    }

    /// Full definition of one tool, including its input schema.
    pub async fn describe_tool(
        &self,
        server_name: &str,
        tool_name: &str,
    ) -> Result<McpTool, GatewayError> {
        let endpoint = self.endpoint(server_name)?;
        self.connector
            .list_tools(endpoint)
            .await?
            .into_iter()
            .find(|t| t.name == tool_name)
            .ok_or_else(|| GatewayError::ToolNotFound {
                server: server_name.to_string(),
                tool: tool_name.to_string(),
            })
    }

    pub async fn execute_tool(
        &self,
        server_name: &str,
        tool_name: &str,
        args: Value,
    ) -> Result<CallToolResult, GatewayError> {
        let endpoint = self.endpoint(server_name)?;
        tracing::debug!(server = server_name, tool = tool_name, "executing MCP tool");
        self.connector.call_tool(endpoint, tool_name, args).await
    }

    /// Hand a final answer back to the orchestrating agent.
    ///
    /// Only logged; the delegating agent reads the session itself.
    pub fn send_response_to_master_agent(&self, response: &str) -> Value {
        tracing::info!(gateway = %self.name, response, "response for master agent");
        json!({ "message": "Response sent to master agent" })
    }
}
