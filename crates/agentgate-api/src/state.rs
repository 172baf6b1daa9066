//! Application state wiring all services together.
//!
//! The runner is generic over its store and connector ports; `AppState` pins
//! it to the infra implementations selected by the settings.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use agentgate_core::agent::engine::AgentEngine;
use agentgate_core::agent::runner::AgentRunner;
use agentgate_core::gateway::Gateway;
use agentgate_core::llm::box_provider::BoxLlmProvider;
use agentgate_infra::config::load_instruction;
use agentgate_infra::mcp::HttpMcpConnector;
use agentgate_infra::store::{self, MemoryBackend, SessionBackend};
use agentgate_types::agent::AgentConfig;
use agentgate_types::config::Settings;

pub type ConcreteRunner = AgentRunner<SessionBackend, MemoryBackend, HttpMcpConnector>;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<ConcreteRunner>,
    pub settings: Arc<Settings>,
    /// Upper bound on one agent invocation.
    pub request_timeout: Duration,
}

impl AppState {
    /// Connect the store, build the LLM provider and MCP gateway, and load
    /// the agent instruction.
    pub async fn init(settings: Settings) -> anyhow::Result<Self> {
        let provider = agentgate_infra::llm::build_provider(&settings.agent.model)?;
        let (sessions, memory) = store::connect(&settings.store).await?;
        let instruction = load_instruction(Path::new(&settings.agent.instruction_path));
        Self::assemble(settings, provider, sessions, memory, instruction)
    }

    /// Wire already-built parts together.
    pub fn assemble(
        settings: Settings,
        provider: BoxLlmProvider,
        sessions: SessionBackend,
        memory: MemoryBackend,
        instruction: String,
    ) -> anyhow::Result<Self> {
        let connector =
            HttpMcpConnector::new(settings.gateway.timeout_secs, settings.gateway.json_response)?;
        let gateway = Gateway::new(
            settings.gateway.name.clone(),
            settings.gateway.backend_servers.clone(),
            connector,
        );
        let engine = AgentEngine::new(provider, Arc::new(gateway));
        let runner = AgentRunner::new(
            settings.app_name(),
            AgentConfig::from(&settings),
            instruction,
            engine,
            sessions,
            memory,
        );

        tracing::info!(
            app_name = %runner.app_name(),
            backend = %settings.store.backend,
            servers = settings.gateway.backend_servers.len(),
            "agent runner ready"
        );
        Ok(Self {
            runner: Arc::new(runner),
            request_timeout: Duration::from_secs(settings.app.request_timeout_secs),
            settings: Arc::new(settings),
        })
    }
}
