//! Infrastructure layer for agentgate.
//!
//! Implements the ports defined in `agentgate-core`: Redis and in-memory
//! session/memory stores, the MCP streamable-HTTP connector and the
//! OpenAI-compatible LLM provider. Also loads settings from the environment
//! and registers the agent with its master agent.

pub mod config;
pub mod llm;
pub mod master;
pub mod mcp;
pub mod store;
