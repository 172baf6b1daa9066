//! AgentRunner: one request from message to persisted reply.
//!
//! The runner owns the session and memory repositories and the engine. A
//! run appends the user message to the session, recalls memories, lets the
//! engine answer, appends the engine's events and finally archives the whole
//! session into memory.

use agentgate_types::agent::AgentConfig;
use agentgate_types::error::AgentError;
use agentgate_types::session::{Content, Event, Session, StateMap};
use serde_json::json;
use tracing::{info, warn};

use crate::gateway::connector::McpConnector;
use crate::memory::repository::MemoryRepository;
use crate::session::repository::SessionRepository;

use super::context::{AgentContext, USER_AUTHOR};
use super::engine::AgentEngine;

/// Session used by `/chat` when the caller names none.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Upper bound on memories injected into one prompt.
pub const MAX_RECALLED_MEMORIES: usize = 20;

/// Reply to a chat message.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub reply: String,
    pub session_id: String,
}

pub struct AgentRunner<S, M, C>
where
    S: SessionRepository,
    M: MemoryRepository,
    C: McpConnector,
{
    app_name: String,
    config: AgentConfig,
    instruction: String,
    engine: AgentEngine<C>,
    sessions: S,
    memory: M,
}

impl<S, M, C> AgentRunner<S, M, C>
where
    S: SessionRepository,
    M: MemoryRepository,
    C: McpConnector,
{
    pub fn new(
        app_name: impl Into<String>,
        config: AgentConfig,
        instruction: impl Into<String>,
        engine: AgentEngine<C>,
        sessions: S,
        memory: M,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            config,
            instruction: instruction.into(),
            engine,
            sessions,
            memory,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// Create an empty session for `user_id`. A blank id gets a UUID.
    pub async fn create_new_session(
        &self,
        user_id: &str,
        session_id: Option<&str>,
    ) -> Result<Session, AgentError> {
        let session = self
            .sessions
            .create_session(&self.app_name, user_id, None, session_id)
            .await?;
        info!(user_id, session_id = %session.id, "created session");
        Ok(session)
    }

    /// Answer `message` in the named session, creating it on first use.
    pub async fn chat(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        message: &str,
    ) -> Result<ChatOutcome, AgentError> {
        validate(user_id, message)?;
        let session_id = session_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SESSION_ID);

        let found = self
            .sessions
            .get_session(&self.app_name, user_id, session_id, None)
            .await?;
        let session = match owned_by(found, user_id, session_id)? {
            Some(session) => session,
            None => {
                self.sessions
                    .create_session(&self.app_name, user_id, None, Some(session_id))
                    .await?
            }
        };

        let reply = self.run(session, message, StateMap::new()).await?;
        Ok(ChatOutcome {
            reply,
            session_id: session_id.to_string(),
        })
    }

    /// Run a task delegated by a master agent in an existing session.
    ///
    /// The caller and the delegating session are recorded in session state
    /// so the instruction can refer to them.
    pub async fn run_delegated(
        &self,
        parent_session_id: &str,
        session_id: &str,
        user_id: &str,
        message: &str,
    ) -> Result<String, AgentError> {
        validate(user_id, message)?;
        let found = self
            .sessions
            .get_session(&self.app_name, user_id, session_id, None)
            .await?;
        let session = owned_by(found, user_id, session_id)?
            .ok_or_else(|| AgentError::SessionNotFound(session_id.to_string()))?;

        let state_delta = StateMap::from([
            ("user_id".to_string(), json!(user_id)),
            ("parent_session_id".to_string(), json!(parent_session_id)),
        ]);
        self.run(session, message, state_delta).await
    }

    async fn run(
        &self,
        mut session: Session,
        message: &str,
        state_delta: StateMap,
    ) -> Result<String, AgentError> {
        let invocation_id = format!("e-{}", uuid::Uuid::new_v4());

        let mut memories = self
            .memory
            .search_memory(&self.app_name, &session.user_id, message)
            .await?
            .memories;
        memories.truncate(MAX_RECALLED_MEMORIES);

        let user_event = Event::new(&invocation_id, USER_AUTHOR)
            .with_content(Content::user_text(message))
            .with_state_delta(state_delta);
        self.sessions.append_event(&mut session, user_event).await?;

        let context = AgentContext::new(
            self.config.clone(),
            &self.instruction,
            &session,
            memories,
        );
        let turn = self.engine.run(&context, &invocation_id).await?;

        for event in turn.events {
            self.sessions.append_event(&mut session, event).await?;
        }
        self.memory.add_session_to_memory(&session).await?;

        if turn.reply.is_empty() {
            warn!(session_id = %session.id, "model returned an empty reply");
        }
        info!(
            user_id = %session.user_id,
            session_id = %session.id,
            invocation_id = %invocation_id,
            input_tokens = turn.usage.input_tokens,
            output_tokens = turn.usage.output_tokens,
            "agent run complete"
        );
        Ok(turn.reply)
    }
}

/// Refuse a loaded session that belongs to someone else.
fn owned_by(
    found: Option<Session>,
    user_id: &str,
    session_id: &str,
) -> Result<Option<Session>, AgentError> {
    match found {
        Some(session) if session.user_id != user_id => {
            warn!(
                user_id,
                owner = %session.user_id,
                session_id,
                "store returned a session owned by another user"
            );
            Err(AgentError::SessionNotFound(session_id.to_string()))
        }
        other => Ok(other),
    }
}

fn validate(user_id: &str, message: &str) -> Result<(), AgentError> {
    if user_id.trim().is_empty() {
        return Err(AgentError::Validation("user_id must not be empty".to_string()));
    }
    if message.trim().is_empty() {
        return Err(AgentError::Validation("message must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::gateway::Gateway;
    use crate::llm::box_provider::BoxLlmProvider;
    use crate::testing::{
        FakeMemory, FakeSessions, MockConnector, ScriptedProvider, text_response, tool_response,
    };
    use agentgate_types::error::RepositoryError;
    use agentgate_types::llm::{CompletionResponse, LlmError};

    type TestRunner = AgentRunner<FakeSessions, FakeMemory, MockConnector>;

    fn runner_with(provider: ScriptedProvider, sessions: FakeSessions) -> TestRunner {
        let gateway = Gateway::new("gw", BTreeMap::new(), MockConnector::default());
        let engine = AgentEngine::new(BoxLlmProvider::new(provider), Arc::new(gateway));
        let config = AgentConfig {
            name: "helper".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 512,
            temperature: None,
            max_tool_rounds: 3,
        };
        AgentRunner::new(
            "aiintime_helper",
            config,
            "Be brief.",
            engine,
            sessions,
            FakeMemory::default(),
        )
    }

    fn runner(script: Vec<Result<CompletionResponse, LlmError>>) -> TestRunner {
        runner_with(ScriptedProvider::new(script), FakeSessions::default())
    }

    #[tokio::test]
    async fn test_chat_uses_default_session_and_persists_events() {
        let runner = runner(vec![text_response("Hello Ada.")]);
        let outcome = runner.chat("ada", None, "Hi, I'm Ada").await.unwrap();
        assert_eq!(outcome.reply, "Hello Ada.");
        assert_eq!(outcome.session_id, DEFAULT_SESSION_ID);

        let session = runner
            .sessions()
            .get_session("aiintime_helper", "ada", DEFAULT_SESSION_ID, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.events.len(), 2);
        assert_eq!(session.events[0].author, "user");
        assert_eq!(session.events[1].author, "helper");
    }

    #[tokio::test]
    async fn test_chat_history_carries_into_next_turn() {
        let provider = ScriptedProvider::new(vec![text_response("Noted."), text_response("Ada.")]);
        let requests = provider.requests.clone();
        let runner = runner_with(provider, FakeSessions::default());

        runner.chat("ada", Some("s1"), "My name is Ada").await.unwrap();
        runner.chat("ada", Some("s1"), "What is my name?").await.unwrap();

        let requests = requests.lock().unwrap();
        let messages = &requests[1].messages;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "My name is Ada");
        assert_eq!(messages[2].content, "What is my name?");
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let provider = ScriptedProvider::new(vec![text_response("ok"), text_response("ok")]);
        let requests = provider.requests.clone();
        let runner = runner_with(provider, FakeSessions::default());

        runner.chat("ada", None, "secret plan alpha").await.unwrap();
        runner.chat("bob", None, "what is the plan").await.unwrap();

        let requests = requests.lock().unwrap();
        let bob = &requests[1];
        assert_eq!(bob.messages.len(), 1);
        assert!(!bob.system.as_deref().unwrap().contains("alpha"));
    }

    #[tokio::test]
    async fn test_memory_recalled_in_later_session() {
        let provider = ScriptedProvider::new(vec![text_response("ok"), text_response("Lyon")]);
        let requests = provider.requests.clone();
        let runner = runner_with(provider, FakeSessions::default());

        runner.chat("ada", Some("s1"), "I live in Lyon").await.unwrap();
        runner.chat("ada", Some("s2"), "Where do I live").await.unwrap();

        let requests = requests.lock().unwrap();
        let system = requests[1].system.as_deref().unwrap();
        assert!(system.contains("<memory>"));
        assert!(system.contains("I live in Lyon"));
    }

    #[tokio::test]
    async fn test_run_delegated_records_state() {
        let runner = runner(vec![
            tool_response(&[("c1", "send_response_to_master_agent", json!({"response": "done"}))]),
            text_response("Finished."),
        ]);
        let session = runner.create_new_session("ada", None).await.unwrap();
        let reply = runner
            .run_delegated("parent-1", &session.id, "ada", "do the thing")
            .await
            .unwrap();
        assert_eq!(reply, "Finished.");

        let stored = runner
            .sessions()
            .get_session("aiintime_helper", "ada", &session.id, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.state["parent_session_id"], json!("parent-1"));
        assert_eq!(stored.state["user_id"], json!("ada"));
        assert_eq!(stored.events.len(), 4);
    }

    #[tokio::test]
    async fn test_recall_keeps_newest_memories() {
        let provider = ScriptedProvider::new(vec![text_response("ok")]);
        let requests = provider.requests.clone();
        let runner = runner_with(provider, FakeSessions::default());

        let events = (0..30)
            .map(|i| {
                let mut event = Event::new("inv-old", USER_AUTHOR)
                    .with_content(Content::user_text(format!("note {i} about weather")));
                event.timestamp = i as f64;
                event
            })
            .collect();
        let archived = Session {
            id: "old".to_string(),
            app_name: "aiintime_helper".to_string(),
            user_id: "ada".to_string(),
            state: StateMap::new(),
            events,
            last_update_time: 29.0,
        };
        runner.memory().add_session_to_memory(&archived).await.unwrap();

        runner.chat("ada", Some("s1"), "weather today?").await.unwrap();

        let requests = requests.lock().unwrap();
        let system = requests[0].system.as_deref().unwrap();
        assert!(system.contains("note 29 about weather"));
        assert!(system.contains("note 10 about weather"));
        assert!(!system.contains("note 9 about weather"));
    }

    #[test]
    fn test_owned_by_rejects_foreign_session() {
        let session = Session {
            id: "default".to_string(),
            app_name: "aiintime_helper".to_string(),
            user_id: "a:b".to_string(),
            state: StateMap::new(),
            events: Vec::new(),
            last_update_time: 0.0,
        };
        let err = owned_by(Some(session.clone()), "a", "b:default").unwrap_err();
        assert!(matches!(err, AgentError::SessionNotFound(id) if id == "b:default"));
        assert!(owned_by(Some(session), "a:b", "default").unwrap().is_some());
        assert!(owned_by(None, "a", "s1").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_run_delegated_unknown_session() {
        let runner = runner(vec![]);
        let err = runner
            .run_delegated("parent-1", "missing", "ada", "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::SessionNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_validation_rejects_blank_input() {
        let runner = runner(vec![]);
        assert!(matches!(
            runner.chat(" ", None, "hi").await,
            Err(AgentError::Validation(_))
        ));
        assert!(matches!(
            runner.chat("ada", None, "").await,
            Err(AgentError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let runner = runner_with(
            ScriptedProvider::new(vec![text_response("unused")]),
            FakeSessions::failing(),
        );
        let err = runner.chat("ada", None, "hi").await.unwrap_err();
        assert!(matches!(err, AgentError::Repository(RepositoryError::Connection(_))));
    }
}
