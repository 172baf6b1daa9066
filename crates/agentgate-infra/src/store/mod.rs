//! Session and memory store backends.
//!
//! `STORE__BACKEND` selects Redis (default) or the in-process maps. The
//! backend enums dispatch statically so the runner stays generic over one
//! concrete repository type per port.

pub mod in_memory;
pub mod keys;
pub mod redis;

use agentgate_core::memory::repository::MemoryRepository;
use agentgate_core::session::repository::SessionRepository;
use agentgate_types::config::{StoreBackend, StoreSettings};
use agentgate_types::error::RepositoryError;
use agentgate_types::memory::SearchMemoryResponse;
use agentgate_types::session::{Event, GetSessionConfig, Session, StateMap};

use self::in_memory::{InMemoryMemoryRepository, InMemorySessionRepository};
use self::redis::{RedisMemoryRepository, RedisPool, RedisSessionRepository};

pub enum SessionBackend {
    Redis(RedisSessionRepository),
    InMemory(InMemorySessionRepository),
}

pub enum MemoryBackend {
    Redis(RedisMemoryRepository),
    InMemory(InMemoryMemoryRepository),
}

/// Open the configured store and return its session and memory repositories.
pub async fn connect(settings: &StoreSettings) -> Result<(SessionBackend, MemoryBackend), RepositoryError> {
    match settings.backend {
        StoreBackend::Redis => {
            let pool = RedisPool::connect(settings).await?;
            Ok((
                SessionBackend::Redis(RedisSessionRepository::new(pool.clone())),
                MemoryBackend::Redis(RedisMemoryRepository::new(pool)),
            ))
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; sessions are lost on restart");
            Ok(in_memory())
        }
    }
}

/// Fresh in-process repositories.
pub fn in_memory() -> (SessionBackend, MemoryBackend) {
    (
        SessionBackend::InMemory(InMemorySessionRepository::new()),
        MemoryBackend::InMemory(InMemoryMemoryRepository::new()),
    )
}

impl SessionRepository for SessionBackend {
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        state: Option<StateMap>,
        session_id: Option<&str>,
    ) -> Result<Session, RepositoryError> {
        match self {
            Self::Redis(repo) => repo.create_session(app_name, user_id, state, session_id).await,
            Self::InMemory(repo) => repo.create_session(app_name, user_id, state, session_id).await,
        }
    }

    async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
        config: Option<&GetSessionConfig>,
    ) -> Result<Option<Session>, RepositoryError> {
        match self {
            Self::Redis(repo) => repo.get_session(app_name, user_id, session_id, config).await,
            Self::InMemory(repo) => repo.get_session(app_name, user_id, session_id, config).await,
        }
    }

    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>, RepositoryError> {
        match self {
            Self::Redis(repo) => repo.list_sessions(app_name, user_id).await,
            Self::InMemory(repo) => repo.list_sessions(app_name, user_id).await,
        }
    }

    async fn delete_session(&self, app_name: &str, user_id: &str, session_id: &str) -> Result<(), RepositoryError> {
        match self {
            Self::Redis(repo) => repo.delete_session(app_name, user_id, session_id).await,
            Self::InMemory(repo) => repo.delete_session(app_name, user_id, session_id).await,
        }
    }

    async fn append_event(&self, session: &mut Session, event: Event) -> Result<Event, RepositoryError> {
        match self {
            Self::Redis(repo) => repo.append_event(session, event).await,
            Self::InMemory(repo) => repo.append_event(session, event).await,
        }
    }
}

impl MemoryRepository for MemoryBackend {
    async fn add_session_to_memory(&self, session: &Session) -> Result<(), RepositoryError> {
        match self {
            Self::Redis(repo) => repo.add_session_to_memory(session).await,
            Self::InMemory(repo) => repo.add_session_to_memory(session).await,
        }
    }

    async fn search_memory(
        &self,
        app_name: &str,
        user_id: &str,
        query: &str,
    ) -> Result<SearchMemoryResponse, RepositoryError> {
        match self {
            Self::Redis(repo) => repo.search_memory(app_name, user_id, query).await,
            Self::InMemory(repo) => repo.search_memory(app_name, user_id, query).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_selected_without_network() {
        let settings = StoreSettings {
            backend: StoreBackend::Memory,
            ..StoreSettings::default()
        };
        let (sessions, memory) = connect(&settings).await.unwrap();
        assert!(matches!(sessions, SessionBackend::InMemory(_)));
        assert!(matches!(memory, MemoryBackend::InMemory(_)));

        let session = sessions.create_session("app", "u1", None, None).await.unwrap();
        memory.add_session_to_memory(&session).await.unwrap();
        assert!(sessions.get_session("app", "u1", &session.id, None).await.unwrap().is_some());
    }
}
