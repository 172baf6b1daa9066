//! Business logic and port definitions for agentgate.
//!
//! This crate defines the "ports" (repository and connector traits) that the
//! infrastructure layer implements, plus the gateway tools and the agent
//! runtime built on them. It depends only on `agentgate-types` -- never on
//! `agentgate-infra` or any network/store crate.

pub mod agent;
pub mod gateway;
pub mod llm;
pub mod memory;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
