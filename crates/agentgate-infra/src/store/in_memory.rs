//! Process-local session and memory repositories.
//!
//! Same semantics as the Redis backend, held in `DashMap`s. Used for local
//! development (`STORE__BACKEND=memory`) and in tests. Nothing survives a
//! restart.

use std::collections::BTreeMap;

use agentgate_core::memory::repository::MemoryRepository;
use agentgate_core::memory::search::{memorable_events, search_events};
use agentgate_core::session::repository::SessionRepository;
use agentgate_core::session::state::{apply_event, merge_state, partition_delta, storable_event};
use agentgate_types::error::RepositoryError;
use agentgate_types::memory::SearchMemoryResponse;
use agentgate_types::session::{Event, GetSessionConfig, Session, StateMap, now_timestamp};
use dashmap::DashMap;

use super::keys;
use super::redis::resolve_session_id;

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: DashMap<String, Session>,
    /// Shared state keyed like the Redis state keys.
    state: DashMap<String, StateMap>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn shared_state(&self, key: &str) -> StateMap {
        self.state.get(key).map(|s| s.value().clone()).unwrap_or_default()
    }

    fn update_state(&self, key: String, delta: StateMap) {
        if !delta.is_empty() {
            self.state.entry(key).or_default().extend(delta);
        }
    }

    fn merged(&self, mut session: Session) -> Session {
        let app_state = self.shared_state(&keys::app_state_key(&session.app_name));
        let user_state = self.shared_state(&keys::user_state_key(&session.app_name, &session.user_id));
        merge_state(&mut session, &app_state, &user_state);
        session
    }
}

impl SessionRepository for InMemorySessionRepository {
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        state: Option<StateMap>,
        session_id: Option<&str>,
    ) -> Result<Session, RepositoryError> {
        let id = resolve_session_id(session_id);
        let scoped = partition_delta(&state.unwrap_or_default());

        let session = Session {
            id: id.clone(),
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            state: scoped.session,
            events: Vec::new(),
            last_update_time: now_timestamp(),
        };
        self.sessions
            .insert(keys::session_key(app_name, user_id, &id), session.clone());
        self.update_state(keys::app_state_key(app_name), scoped.app);
        self.update_state(keys::user_state_key(app_name, user_id), scoped.user);
        Ok(self.merged(session))
    }

    async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
        config: Option<&GetSessionConfig>,
    ) -> Result<Option<Session>, RepositoryError> {
        let stored = self
            .sessions
            .get(&keys::session_key(app_name, user_id, session_id))
            .map(|s| s.value().clone())
            .filter(|s| s.user_id == user_id && s.app_name == app_name);
        Ok(stored.map(|mut session| {
            if let Some(config) = config {
                config.apply(&mut session.events);
            }
            self.merged(session)
        }))
    }

    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>, RepositoryError> {
        let prefix = keys::session_prefix(app_name, user_id);
        let found: Vec<Session> = self
            .sessions
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix) && entry.value().user_id == user_id)
            .map(|entry| {
                let mut session = entry.value().clone();
                session.events.clear();
                session
            })
            .collect();
        let mut sessions: Vec<Session> = found.into_iter().map(|s| self.merged(s)).collect();
        sessions.sort_by(|a, b| b.last_update_time.total_cmp(&a.last_update_time));
        Ok(sessions)
    }

    async fn delete_session(&self, app_name: &str, user_id: &str, session_id: &str) -> Result<(), RepositoryError> {
        self.sessions
            .remove(&keys::session_key(app_name, user_id, session_id));
        Ok(())
    }

    async fn append_event(&self, session: &mut Session, event: Event) -> Result<Event, RepositoryError> {
        let event = storable_event(event);
        let scoped = partition_delta(&event.actions.state_delta);

        let key = keys::session_key(&session.app_name, &session.user_id, &session.id);
        {
            let mut stored = self.sessions.get_mut(&key).ok_or(RepositoryError::NotFound)?;
            stored.state.extend(scoped.session);
            stored.events.push(event.clone());
            stored.last_update_time = event.timestamp;
        }
        self.update_state(keys::app_state_key(&session.app_name), scoped.app);
        self.update_state(
            keys::user_state_key(&session.app_name, &session.user_id),
            scoped.user,
        );
        apply_event(session, &event);
        Ok(event)
    }
}

#[derive(Default)]
pub struct InMemoryMemoryRepository {
    /// memory key -> session id -> archived events
    archive: DashMap<String, BTreeMap<String, Vec<Event>>>,
}

impl InMemoryMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryRepository for InMemoryMemoryRepository {
    async fn add_session_to_memory(&self, session: &Session) -> Result<(), RepositoryError> {
        let events = memorable_events(session);
        if events.is_empty() {
            return Ok(());
        }
        self.archive
            .entry(keys::memory_key(&session.app_name, &session.user_id))
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
        let Some(sessions) = self.archive.get(&keys::memory_key(app_name, user_id)) else {
            return Ok(SearchMemoryResponse::default());
        };
        Ok(search_events(sessions.values().flatten(), query))
    }
}
