//! Gateway operations as model-callable function tools.
//!
//! Each `GatewayTool` has a fixed name and JSON Schema. `Gateway::invoke`
//! decodes the model's arguments and returns a JSON result for the tool
//! response message.

use agentgate_types::error::GatewayError;
use agentgate_types::llm::ToolDefinition;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::Gateway;
use super::connector::McpConnector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayTool {
    ListMcpServers,
    ListMcpTools,
    DescribeMcpTool,
    ExecuteMcpTool,
    SendResponseToMasterAgent,
}

impl GatewayTool {
    pub const ALL: [GatewayTool; 5] = [
        GatewayTool::ListMcpServers,
        GatewayTool::ListMcpTools,
        GatewayTool::DescribeMcpTool,
        GatewayTool::ExecuteMcpTool,
        GatewayTool::SendResponseToMasterAgent,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GatewayTool::ListMcpServers => "list_mcp_servers",
            GatewayTool::ListMcpTools => "list_mcp_tools",
            GatewayTool::DescribeMcpTool => "describe_mcp_tool",
            GatewayTool::ExecuteMcpTool => "execute_mcp_tool",
            GatewayTool::SendResponseToMasterAgent => "send_response_to_master_agent",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn definition(self) -> ToolDefinition {
        let (description, parameters) = match self {
            GatewayTool::ListMcpServers => (
                "List all backend MCP servers.",
                json!({"type": "object", "properties": {}}),
            ),
            GatewayTool::ListMcpTools => (
                "List all tools for a specific MCP server.",
                json!({
                    "type": "object",
                    "properties": {
                        "server_name": {"type": "string", "description": "Name of the MCP server"}
                    },
                    "required": ["server_name"]
                }),
            ),
            GatewayTool::DescribeMcpTool => (
                "Describe a specific tool for an MCP server.",
                json!({
                    "type": "object",
                    "properties": {
                        "server_name": {"type": "string", "description": "Name of the MCP server"},
                        "api_name": {"type": "string", "description": "Name of the tool"}
                    },
                    "required": ["server_name", "api_name"]
                }),
            ),
            GatewayTool::ExecuteMcpTool => (
                "Execute a tool on a given MCP server.",
                json!({
                    "type": "object",
                    "properties": {
                        "server_name": {"type": "string", "description": "Name of the MCP server"},
                        "api_name": {"type": "string", "description": "Name of the tool"},
                        "args": {"type": "object", "description": "Arguments for the tool"}
                    },
                    "required": ["server_name", "api_name", "args"]
                }),
            ),
            GatewayTool::SendResponseToMasterAgent => (
                "Send response to master agent.",
                json!({
                    "type": "object",
                    "properties": {
                        "response": {"type": "string", "description": "Response to send to master agent"}
                    },
                    "required": ["response"]
                }),
            ),
        };
        ToolDefinition {
            name: self.name().to_string(),
            description: description.to_string(),
            parameters,
        }
    }

    pub fn definitions() -> Vec<ToolDefinition> {
        Self::ALL.into_iter().map(Self::definition).collect()
    }
}

#[derive(Deserialize)]
struct ServerArgs {
    server_name: String,
}

#[derive(Deserialize)]
struct DescribeArgs {
    server_name: String,
    api_name: String,
}

#[derive(Deserialize)]
struct ExecuteArgs {
    server_name: String,
    api_name: String,
    #[serde(default = "empty_object")]
    args: Value,
}

#[derive(Deserialize)]
struct ResponseArgs {
    response: String,
}

fn empty_object() -> Value {
    json!({})
}

fn decode<T: DeserializeOwned>(tool: GatewayTool, args: &Value) -> Result<T, GatewayError> {
    // Models sometimes send `null` for tools without parameters.
    let empty = empty_object();
    let args = if args.is_null() { &empty } else { args };
    T::deserialize(args).map_err(|e| GatewayError::InvalidArguments {
        tool: tool.name().to_string(),
        message: e.to_string(),
    })
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, GatewayError> {
    serde_json::to_value(value).map_err(|e| GatewayError::Protocol(e.to_string()))
}

impl<C: McpConnector> Gateway<C> {
    /// Run the named gateway tool with the model-supplied arguments.
    pub async fn invoke(&self, tool_name: &str, args: &Value) -> Result<Value, GatewayError> {
        let tool = GatewayTool::from_name(tool_name)
            .ok_or_else(|| GatewayError::UnknownTool(tool_name.to_string()))?;

        match tool {
            GatewayTool::ListMcpServers => to_value(&self.list_servers().await?),
            GatewayTool::ListMcpTools => {
                let a: ServerArgs = decode(tool, args)?;
                to_value(&self.list_tools(&a.server_name).await?)
            }
            GatewayTool::DescribeMcpTool => {
                let a: DescribeArgs = decode(tool, args)?;
                to_value(&self.describe_tool(&a.server_name, &a.api_name).await?)
            }
            GatewayTool::ExecuteMcpTool => {
                let a: ExecuteArgs = decode(tool, args)?;
                to_value(&self.execute_tool(&a.server_name, &a.api_name, a.args).await?)
            }
            GatewayTool::SendResponseToMasterAgent => {
                let a: ResponseArgs = decode(tool, args)?;
                Ok(self.send_response_to_master_agent(&a.response))
            }
        }
    }
}
