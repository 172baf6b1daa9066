//! Agent runtime for agentgate.
//!
//! - `AgentContext`: system prompt and conversation history for one run
//! - `SystemPromptBuilder`: assembles instruction + state + memories into an XML-tagged prompt
//! - `AgentEngine`: the LLM/tool loop
//! - `AgentRunner`: ties the engine to session and memory persistence

pub mod context;
pub mod engine;
pub mod prompt;
pub mod runner;
