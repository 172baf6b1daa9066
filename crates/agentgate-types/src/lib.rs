//! Shared domain types for agentgate.
//!
//! Configuration, session/event records, memory entries, LLM and MCP wire
//! shapes, and the error enums used across the workspace.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror, secrecy.

pub mod agent;
pub mod config;
pub mod error;
pub mod gateway;
pub mod llm;
pub mod memory;
pub mod session;
