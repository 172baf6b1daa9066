//! MCP client implementations.

pub mod http;
pub mod jsonrpc;

pub use http::HttpMcpConnector;
