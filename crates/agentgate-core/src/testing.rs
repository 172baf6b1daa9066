//! In-process fakes for the core ports, shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use agentgate_types::error::{GatewayError, RepositoryError};
use agentgate_types::gateway::{CallToolResult, InitializeResult, McpTool, ServerInfo};
use agentgate_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StopReason, ToolCall,
    Usage,
};
use agentgate_types::memory::SearchMemoryResponse;
use agentgate_types::session::{Event, GetSessionConfig, Session, StateMap, now_timestamp};
use serde_json::{Value, json};

use crate::gateway::connector::McpConnector;
use crate::llm::provider::LlmProvider;
use crate::memory::repository::MemoryRepository;
use crate::memory::search::{memorable_events, search_events};
use crate::session::repository::SessionRepository;
use crate::session::state::{apply_event, partition_delta, storable_event};

#[derive(Default)]
pub struct MockConnector {
    pub tools: HashMap<String, Vec<McpTool>>,
    pub calls: Mutex<Vec<(String, String, Value)>>,
}

impl MockConnector {
    pub fn with_tool(mut self, endpoint: &str, name: &str, description: &str) -> Self {
        self.tools.entry(endpoint.to_string()).or_default().push(McpTool {
            name: name.to_string(),
            description: Some(description.to_string()),
            input_schema: json!({"type": "object"}),
            output_schema: None,
        });
        self
    }
}

impl McpConnector for MockConnector {
    async fn initialize(&self, endpoint: &str) -> Result<InitializeResult, GatewayError> {
        if endpoint.contains("down") {
            return Err(GatewayError::Transport("connection refused".to_string()));
        }
        Ok(InitializeResult {
            protocol_version: "2025-03-26".to_string(),
            server_info: ServerInfo {
                name: endpoint.to_string(),
                version: "0.9.0".to_string(),
            },
            instructions: None,
        })
    }

    async fn list_tools(&self, endpoint: &str) -> Result<Vec<McpTool>, GatewayError> {
        Ok(self.tools.get(endpoint).cloned().unwrap_or_default())
    }

    async fn call_tool(
        &self,
        endpoint: &str,
        tool_name: &str,
        arguments: Value,
    ) -> Result<CallToolResult, GatewayError> {
        self.calls.lock().unwrap().push((
            endpoint.to_string(),
            tool_name.to_string(),
            arguments.clone(),
        ));
        Ok(CallToolResult {
            content: vec![json!({"type": "text", "text": format!("{tool_name} ok")})],
            structured_content: Some(arguments),
            is_error: false,
        })
    }
}

/// Replays canned responses in order and records every request.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<CompletionResponse, LlmError>>>,
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
    capabilities: ProviderCapabilities,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<CompletionResponse, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Arc::new(Mutex::new(Vec::new())),
            capabilities: ProviderCapabilities {
                tool_calling: true,
                max_context_tokens: 128_000,
                max_output_tokens: 4096,
            },
        }
    }

    pub fn without_tools(mut self) -> Self {
        self.capabilities.tool_calling = false;
        self
    }
}

pub fn text_response(text: &str) -> Result<CompletionResponse, LlmError> {
    Ok(CompletionResponse {
        id: "resp".to_string(),
        content: text.to_string(),
        model: "test-model".to_string(),
        stop_reason: StopReason::EndTurn,
        usage: Usage {
            input_tokens: 10,
            output_tokens: 5,
        },
        tool_calls: Vec::new(),
    })
}

pub fn tool_response(calls: &[(&str, &str, Value)]) -> Result<CompletionResponse, LlmError> {
    Ok(CompletionResponse {
        id: "resp".to_string(),
        content: String::new(),
        model: "test-model".to_string(),
        stop_reason: StopReason::ToolUse,
        usage: Usage {
            input_tokens: 10,
            output_tokens: 5,
        },
        tool_calls: calls
            .iter()
            .map(|(id, name, args)| ToolCall {
                id: id.to_string(),
                name: name.to_string(),
                arguments: args.clone(),
            })
            .collect(),
    })
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| text_response("done"))
    }
}

type SessionKey = (String, String, String);

/// Minimal session store honoring the scoped state rules.
#[derive(Default)]
pub struct FakeSessions {
    sessions: Mutex<HashMap<SessionKey, Session>>,
    app_state: Mutex<HashMap<String, StateMap>>,
    user_state: Mutex<HashMap<(String, String), StateMap>>,
    pub fail: bool,
}

impl FakeSessions {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.fail {
            Err(RepositoryError::Connection("store unreachable".to_string()))
        } else {
            Ok(())
        }
    }

    fn merged(&self, mut session: Session) -> Session {
        let app = self
            .app_state
            .lock()
            .unwrap()
            .get(&session.app_name)
            .cloned()
            .unwrap_or_default();
        let user = self
            .user_state
            .lock()
            .unwrap()
            .get(&(session.app_name.clone(), session.user_id.clone()))
            .cloned()
            .unwrap_or_default();
        crate::session::state::merge_state(&mut session, &app, &user);
        session
    }
}

impl SessionRepository for FakeSessions {
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        state: Option<StateMap>,
        session_id: Option<&str>,
    ) -> Result<Session, RepositoryError> {
        self.check()?;
        let id = session_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let scoped = partition_delta(&state.unwrap_or_default());
        let session = Session {
            id: id.clone(),
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            state: scoped.session,
            events: Vec::new(),
            last_update_time: now_timestamp(),
        };
        self.sessions.lock().unwrap().insert(
            (app_name.to_string(), user_id.to_string(), id),
            session.clone(),
        );
        Ok(self.merged(session))
    }

    async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
        config: Option<&GetSessionConfig>,
    ) -> Result<Option<Session>, RepositoryError> {
        self.check()?;
        let key = (
            app_name.to_string(),
            user_id.to_string(),
            session_id.to_string(),
        );
        let found = self.sessions.lock().unwrap().get(&key).cloned();
        Ok(found.map(|mut s| {
            if let Some(config) = config {
                config.apply(&mut s.events);
            }
            self.merged(s)
        }))
    }

    async fn list_sessions(
        &self,
        app_name: &str,
        user_id: &str,
    ) -> Result<Vec<Session>, RepositoryError> {
        self.check()?;
        let sessions: Vec<Session> = self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|((a, u, _), _)| a == app_name && u == user_id)
            .map(|(_, s)| Session {
                events: Vec::new(),
                ..s.clone()
            })
            .collect();
        Ok(sessions.into_iter().map(|s| self.merged(s)).collect())
    }

    async fn delete_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<(), RepositoryError> {
        self.check()?;
        self.sessions.lock().unwrap().remove(&(
            app_name.to_string(),
            user_id.to_string(),
            session_id.to_string(),
        ));
        Ok(())
    }

    async fn append_event(
        &self,
        session: &mut Session,
        event: Event,
    ) -> Result<Event, RepositoryError> {
        self.check()?;
        let event = storable_event(event);
        let scoped = partition_delta(&event.actions.state_delta);
        self.app_state
            .lock()
            .unwrap()
            .entry(session.app_name.clone())
            .or_default()
            .extend(scoped.app);
        self.user_state
            .lock()
            .unwrap()
            .entry((session.app_name.clone(), session.user_id.clone()))
            .or_default()
            .extend(scoped.user);
        let key = (
            session.app_name.clone(),
            session.user_id.clone(),
            session.id.clone(),
        );
        if let Some(stored) = self.sessions.lock().unwrap().get_mut(&key) {
            stored.state.extend(scoped.session);
            stored.events.push(event.clone());
            stored.last_update_time = event.timestamp;
        }
        apply_event(session, &event);
        Ok(event)
    }
}

/// Memory archive keyed by `(app, user)` then session id.
#[derive(Default)]
pub struct FakeMemory {
    archive: Mutex<HashMap<(String, String), HashMap<String, Vec<Event>>>>,
}

impl MemoryRepository for FakeMemory {
    async fn add_session_to_memory(&self, session: &Session) -> Result<(), RepositoryError> {
        let events = memorable_events(session);
        if events.is_empty() {
            return Ok(());
        }
        self.archive
            .lock()
            .unwrap()
            .entry((session.app_name.clone(), session.user_id.clone()))
            .or_default()
            .insert(session.id.clone(), events);
        Ok(())
    }

    async fn search_memory(
        &self,
        app_name: &str,
        user_id: &str,
        query: &str,
    ) -> Result<SearchMemoryResponse, RepositoryError> {
        let archive = self.archive.lock().unwrap();
        let Some(sessions) = archive.get(&(app_name.to_string(), user_id.to_string())) else {
            return Ok(SearchMemoryResponse::default());
        };
        Ok(search_events(sessions.values().flatten(), query))
    }
}
