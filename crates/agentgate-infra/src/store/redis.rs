//! Redis-backed session and memory repositories.
//!
//! Sessions are whole JSON documents under plain string keys, app and user
//! state are JSON objects under their own keys, and memory is a hash of
//! session id to JSON event array. No Redis modules are required. See
//! [`super::keys`] for the layout.
//!
//! Every command is bounded by the store timeout so an unreachable server
//! fails the request instead of hanging it.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use agentgate_core::memory::repository::MemoryRepository;
use agentgate_core::memory::search::{memorable_events, search_events};
use agentgate_core::session::repository::SessionRepository;
use agentgate_core::session::state::{apply_event, merge_state, partition_delta, storable_event};
use agentgate_types::config::StoreSettings;
use agentgate_types::error::RepositoryError;
use agentgate_types::memory::SearchMemoryResponse;
use agentgate_types::session::{Event, GetSessionConfig, Session, StateMap, now_timestamp};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ConnectionInfo, IntoConnectionInfo, RedisError, RedisResult};
use secrecy::ExposeSecret;

use super::keys;

/// A shared, reconnecting Redis connection with a per-command timeout.
#[derive(Clone)]
pub struct RedisPool {
    conn: ConnectionManager,
    timeout_secs: u64,
}

impl RedisPool {
    /// Connect using the store settings. Fails if the server cannot be
    /// reached within the timeout.
    pub async fn connect(settings: &StoreSettings) -> Result<Self, RepositoryError> {
        let url = format!("redis://{}:{}/{}", settings.host, settings.port, settings.db);
        let mut info = url
            .into_connection_info()
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;
        if let Some(password) = &settings.password {
            info.redis.password = Some(password.expose_secret().to_string());
        }
        let pool = Self::open(info, settings.timeout_secs).await?;
        tracing::info!(host = %settings.host, port = settings.port, db = settings.db, "connected to Redis");
        Ok(pool)
    }

    /// Connect to an explicit server.
    pub async fn open(info: ConnectionInfo, timeout_secs: u64) -> Result<Self, RepositoryError> {
        let client =
            redis::Client::open(info).map_err(|e| RepositoryError::Connection(e.to_string()))?;

        let timeout = Duration::from_secs(timeout_secs);
        let conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| RepositoryError::Timeout(timeout_secs))?
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;
        Ok(Self { conn, timeout_secs })
    }

    /// Run one command against a fresh handle of the shared connection.
    async fn run<'a, T, F>(
        &self,
        conn: &'a mut ConnectionManager,
        op: impl FnOnce(&'a mut ConnectionManager) -> F,
    ) -> Result<T, RepositoryError>
    where
        F: Future<Output = RedisResult<T>> + 'a,
    {
        match tokio::time::timeout(Duration::from_secs(self.timeout_secs), op(conn)).await {
            Ok(result) => result.map_err(map_redis_error),
            Err(_) => Err(RepositoryError::Timeout(self.timeout_secs)),
        }
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let mut conn = self.conn.clone();
        self.run(&mut conn, |c| c.get(key)).await
    }

    async fn set_string(&self, key: &str, value: String) -> Result<(), RepositoryError> {
        let mut conn = self.conn.clone();
        self.run(&mut conn, |c| c.set::<_, _, ()>(key, value)).await
    }

    async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        let mut conn = self.conn.clone();
        self.run(&mut conn, |c| c.del::<_, ()>(key)).await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, RepositoryError> {
        let mut conn = self.conn.clone();
        self.run(&mut conn, |c| c.keys(pattern)).await
    }

    async fn hset(&self, key: &str, field: &str, value: String) -> Result<(), RepositoryError> {
        let mut conn = self.conn.clone();
        self.run(&mut conn, |c| c.hset::<_, _, _, ()>(key, field, value)).await
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, RepositoryError> {
        let mut conn = self.conn.clone();
        self.run(&mut conn, |c| c.hgetall(key)).await
    }

    async fn get_state(&self, key: &str) -> Result<StateMap, RepositoryError> {
        match self.get_string(key).await? {
            Some(raw) => decode(&raw),
            None => Ok(StateMap::new()),
        }
    }

    /// Merge `delta` into the state object stored at `key`.
    async fn update_state(&self, key: &str, delta: StateMap) -> Result<(), RepositoryError> {
        if delta.is_empty() {
            return Ok(());
        }
        let mut state = self.get_state(key).await?;
        state.extend(delta);
        self.set_string(key, encode(&state)?).await
    }
}

fn map_redis_error(err: RedisError) -> RepositoryError {
    if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() {
        RepositoryError::Connection(err.to_string())
    } else {
        RepositoryError::Query(err.to_string())
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(raw).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

/// Read-modify-write of a stored session document: add the event and its
/// session-scoped state. A missing document means the session was deleted.
fn append_to_document(
    raw: Option<String>,
    event: &Event,
    session_delta: StateMap,
) -> Result<String, RepositoryError> {
    let Some(raw) = raw else {
        return Err(RepositoryError::NotFound);
    };
    let mut stored: Session = decode(&raw)?;
    stored.state.extend(session_delta);
    stored.events.push(event.clone());
    stored.last_update_time = event.timestamp;
    encode(&stored)
}

/// The session listed under `user_id`, without events. Documents owned by
/// another user are skipped.
fn listed_session(
    raw: &str,
    user_id: &str,
    app_state: &StateMap,
    user_state: &StateMap,
) -> Result<Option<Session>, RepositoryError> {
    let mut session: Session = decode(raw)?;
    if session.user_id != user_id {
        return Ok(None);
    }
    session.events.clear();
    merge_state(&mut session, app_state, user_state);
    Ok(Some(session))
}

/// Every readable event of a user's memory hash. Unreadable entries are
/// logged and skipped.
fn archived_events(archived: HashMap<String, String>) -> Vec<Event> {
    let mut events = Vec::new();
    for (session_id, raw) in archived {
        match decode::<Vec<Event>>(&raw) {
            Ok(mut batch) => events.append(&mut batch),
            Err(e) => {
                tracing::warn!(%session_id, error = %e, "skipping unreadable memory entry");
            }
        }
    }
    events
}

/// Session id to use for a new session: the caller's, trimmed, or a v4 UUID.
pub(crate) fn resolve_session_id(session_id: Option<&str>) -> String {
    match session_id.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => uuid::Uuid::new_v4().to_string(),
    }
}

/// Redis implementation of `SessionRepository`.
pub struct RedisSessionRepository {
    pool: RedisPool,
}

impl RedisSessionRepository {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    async fn load(&self, app_name: &str, user_id: &str, session_id: &str) -> Result<Option<Session>, RepositoryError> {
        let key = keys::session_key(app_name, user_id, session_id);
        match self.pool.get_string(&key).await? {
            Some(raw) => {
                let session: Session = decode(&raw)?;
                Ok((session.user_id == user_id).then_some(session))
            }
            None => Ok(None),
        }
    }

    async fn with_shared_state(&self, mut session: Session) -> Result<Session, RepositoryError> {
        let app_state = self.pool.get_state(&keys::app_state_key(&session.app_name)).await?;
        let user_state = self
            .pool
            .get_state(&keys::user_state_key(&session.app_name, &session.user_id))
            .await?;
        merge_state(&mut session, &app_state, &user_state);
        Ok(session)
    }
}

impl SessionRepository for RedisSessionRepository {
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
        self.pool
            .set_string(&keys::session_key(app_name, user_id, &id), encode(&session)?)
            .await?;
        self.pool
            .update_state(&keys::app_state_key(app_name), scoped.app)
            .await?;
        self.pool
            .update_state(&keys::user_state_key(app_name, user_id), scoped.user)
            .await?;

        tracing::debug!(app_name, user_id, session_id = %id, "session created");
        self.with_shared_state(session).await
    }

    async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
        config: Option<&GetSessionConfig>,
    ) -> Result<Option<Session>, RepositoryError> {
        let Some(mut session) = self.load(app_name, user_id, session_id).await? else {
            return Ok(None);
        };
        if let Some(config) = config {
            config.apply(&mut session.events);
        }
        self.with_shared_state(session).await.map(Some)
    }

    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>, RepositoryError> {
        let app_state = self.pool.get_state(&keys::app_state_key(app_name)).await?;
        let user_state = self
            .pool
            .get_state(&keys::user_state_key(app_name, user_id))
            .await?;

        let mut sessions = Vec::new();
        for key in self.pool.keys(&keys::session_pattern(app_name, user_id)).await? {
            // Deleted between KEYS and GET.
            let Some(raw) = self.pool.get_string(&key).await? else {
                continue;
            };
            if let Some(session) = listed_session(&raw, user_id, &app_state, &user_state)? {
                sessions.push(session);
            }
        }
        sessions.sort_by(|a, b| b.last_update_time.total_cmp(&a.last_update_time));
        Ok(sessions)
    }

    async fn delete_session(&self, app_name: &str, user_id: &str, session_id: &str) -> Result<(), RepositoryError> {
        self.pool
            .delete(&keys::session_key(app_name, user_id, session_id))
            .await
    }

    async fn append_event(&self, session: &mut Session, event: Event) -> Result<Event, RepositoryError> {
        let event = storable_event(event);
        let scoped = partition_delta(&event.actions.state_delta);

        let key = keys::session_key(&session.app_name, &session.user_id, &session.id);
        let raw = self.pool.get_string(&key).await?;
        let updated = append_to_document(raw, &event, scoped.session)?;
        self.pool.set_string(&key, updated).await?;

        self.pool
            .update_state(&keys::app_state_key(&session.app_name), scoped.app)
            .await?;
        self.pool
            .update_state(&keys::user_state_key(&session.app_name, &session.user_id), scoped.user)
            .await?;
        apply_event(session, &event);
        Ok(event)
    }
}

/// Redis implementation of `MemoryRepository`.
pub struct RedisMemoryRepository {
    pool: RedisPool,
}

impl RedisMemoryRepository {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

impl MemoryRepository for RedisMemoryRepository {
    async fn add_session_to_memory(&self, session: &Session) -> Result<(), RepositoryError> {
        let events = memorable_events(session);
        if events.is_empty() {
            return Ok(());
        }
        let key = keys::memory_key(&session.app_name, &session.user_id);
        self.pool.hset(&key, &session.id, encode(&events)?).await?;
        tracing::info!(
            session_id = %session.id,
            user_id = %session.user_id,
            events = events.len(),
            "session added to memory"
        );
        Ok(())
    }

    async fn search_memory(
        &self,
        app_name: &str,
        user_id: &str,
        query: &str,
    ) -> Result<SearchMemoryResponse, RepositoryError> {
        let archived = self.pool.hgetall(&keys::memory_key(app_name, user_id)).await?;
        let events = archived_events(archived);
        Ok(search_events(&events, query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentgate_types::config::StoreBackend;
    use agentgate_types::session::Content;
    use serde_json::json;

    fn text_event(text: &str, timestamp: f64) -> Event {
        let mut event = Event::new("inv-1", "user").with_content(Content::user_text(text));
        event.timestamp = timestamp;
        event
    }

    fn stored_session(user_id: &str) -> Session {
        Session {
            id: "s1".to_string(),
            app_name: "weather_bot".to_string(),
            user_id: user_id.to_string(),
            state: StateMap::from([("topic".to_string(), json!("rain"))]),
            events: vec![text_event("first", 1.0)],
            last_update_time: 1.0,
        }
    }

    /// A pool for the server named by `REDIS_URL`, if any. Tests that need a
    /// live server return early without one.
    async fn live_pool() -> Option<RedisPool> {
        let url = std::env::var("REDIS_URL").ok()?;
        let info = url.as_str().into_connection_info().ok()?;
        RedisPool::open(info, 5).await.ok()
    }

    fn unique_app() -> String {
        format!("agentgate_test_{}", uuid::Uuid::new_v4().simple())
    }

    #[test]
    fn test_append_to_document_updates_state_events_and_time() {
        let raw = encode(&stored_session("u1")).unwrap();
        let event = text_event("second", 5.0);
        let updated = append_to_document(
            Some(raw),
            &event,
            StateMap::from([("city".to_string(), json!("Oslo"))]),
        )
        .unwrap();

        let session: Session = decode(&updated).unwrap();
        assert_eq!(session.events.len(), 2);
        assert_eq!(session.events[1].text().as_deref(), Some("second"));
        assert_eq!(session.state.get("topic"), Some(&json!("rain")));
        assert_eq!(session.state.get("city"), Some(&json!("Oslo")));
        assert_eq!(session.last_update_time, 5.0);
    }

    #[test]
    fn test_append_to_missing_document_is_not_found() {
        let err = append_to_document(None, &text_event("hi", 1.0), StateMap::new()).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));

        let err = append_to_document(Some("not json".to_string()), &text_event("hi", 1.0), StateMap::new())
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Serialization(_)));
    }

    #[test]
    fn test_listed_session_clears_events_and_skips_foreign_owner() {
        let raw = encode(&stored_session("a:b")).unwrap();
        let app_state = StateMap::from([("units".to_string(), json!("metric"))]);
        let user_state = StateMap::from([("lang".to_string(), json!("nb"))]);

        assert!(listed_session(&raw, "a", &app_state, &user_state).unwrap().is_none());

        let listed = listed_session(&raw, "a:b", &app_state, &user_state)
            .unwrap()
            .unwrap();
        assert!(listed.events.is_empty());
        assert_eq!(listed.state.get("app:units"), Some(&json!("metric")));
        assert_eq!(listed.state.get("user:lang"), Some(&json!("nb")));
    }

    #[test]
    fn test_archived_events_skips_unreadable_entries() {
        let archived = HashMap::from([
            ("s1".to_string(), encode(&vec![text_event("one", 1.0), text_event("two", 2.0)]).unwrap()),
            ("s2".to_string(), "{broken".to_string()),
            ("s3".to_string(), encode(&vec![text_event("three", 3.0)]).unwrap()),
        ]);
        let events = archived_events(archived);
        assert_eq!(events.len(), 3);

        let found = search_events(&events, "one two three");
        let texts: Vec<String> = found.memories.iter().map(|m| m.text()).collect();
        assert_eq!(texts, vec!["three", "two", "one"]);
    }

    #[tokio::test]
    async fn test_live_session_lifecycle() {
        let Some(pool) = live_pool().await else {
            return;
        };
        let app = unique_app();
        let repo = RedisSessionRepository::new(pool.clone());

        let mut s1 = repo.create_session(&app, "u1", None, Some("s1")).await.unwrap();
        repo.create_session(&app, "u1", None, Some("s2")).await.unwrap();
        let event = Event::new("inv-1", "user")
            .with_content(Content::user_text("hello"))
            .with_state_delta(StateMap::from([
                ("topic".to_string(), json!("rain")),
                ("user:city".to_string(), json!("Oslo")),
                ("app:units".to_string(), json!("metric")),
                ("temp:scratch".to_string(), json!(1)),
            ]));
        repo.append_event(&mut s1, event).await.unwrap();
        assert_eq!(s1.events.len(), 1);

        let reread = repo.get_session(&app, "u1", "s1", None).await.unwrap().unwrap();
        assert_eq!(reread.events.len(), 1);
        assert_eq!(reread.state.get("topic"), Some(&json!("rain")));
        assert_eq!(reread.state.get("user:city"), Some(&json!("Oslo")));
        assert!(!reread.state.contains_key("temp:scratch"));

        let other = repo.create_session(&app, "u2", None, Some("s1")).await.unwrap();
        assert_eq!(other.state.get("app:units"), Some(&json!("metric")));
        assert!(!other.state.contains_key("user:city"));

        let listed = repo.list_sessions(&app, "u1").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
        assert!(listed.iter().all(|s| s.events.is_empty()));

        repo.delete_session(&app, "u1", "s1").await.unwrap();
        let err = repo
            .append_event(&mut s1, Event::new("inv-2", "user").with_content(Content::user_text("again")))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
        assert_eq!(s1.events.len(), 1);
    }

    #[tokio::test]
    async fn test_live_colon_ids_stay_separate() {
        let Some(pool) = live_pool().await else {
            return;
        };
        let app = unique_app();
        let repo = RedisSessionRepository::new(pool);

        let mut private = repo.create_session(&app, "a:b", None, Some("default")).await.unwrap();
        repo.append_event(&mut private, Event::new("inv", "user").with_content(Content::user_text("pin 4242")))
            .await
            .unwrap();

        assert!(repo.get_session(&app, "a", "b:default", None).await.unwrap().is_none());
        assert!(repo.list_sessions(&app, "a").await.unwrap().is_empty());
        assert!(repo.list_sessions(&app, "*").await.unwrap().is_empty());
        assert_eq!(repo.list_sessions(&app, "a:b").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_live_memory_round_trip() {
        let Some(pool) = live_pool().await else {
            return;
        };
        let app = unique_app();
        let memory = RedisMemoryRepository::new(pool);

        let mut session = stored_session("u1");
        session.app_name = app.clone();
        session.events = (0..5).map(|i| text_event(&format!("note {i} about weather"), i as f64)).collect();
        memory.add_session_to_memory(&session).await.unwrap();

        let found = memory.search_memory(&app, "u1", "weather").await.unwrap();
        assert_eq!(found.memories.len(), 5);
        assert_eq!(found.memories[0].text(), "note 4 about weather");
        assert!(memory.search_memory(&app, "u2", "weather").await.unwrap().memories.is_empty());
    }

    #[test]
    fn test_resolve_session_id() {
        assert_eq!(resolve_session_id(Some("  abc ")), "abc");
        let generated = resolve_session_id(Some("   "));
        assert!(uuid::Uuid::parse_str(&generated).is_ok());
        assert!(uuid::Uuid::parse_str(&resolve_session_id(None)).is_ok());
    }

    #[test]
    fn test_map_redis_error_classifies_io() {
        let io = RedisError::from(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"));
        assert!(matches!(map_redis_error(io), RepositoryError::Connection(_)));

        let wrong = RedisError::from((redis::ErrorKind::TypeError, "WRONGTYPE"));
        assert!(matches!(map_redis_error(wrong), RepositoryError::Query(_)));
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails_fast() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let settings = StoreSettings {
            backend: StoreBackend::Redis,
            host: "127.0.0.1".to_string(),
            port,
            password: None,
            db: 0,
            timeout_secs: 2,
        };
        let started = std::time::Instant::now();
        let err = RedisPool::connect(&settings).await.err().unwrap();
        assert!(matches!(err, RepositoryError::Connection(_) | RepositoryError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
