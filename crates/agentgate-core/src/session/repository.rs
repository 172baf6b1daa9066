//! SessionRepository trait definition.
//!
//! Provides create/read/list/delete for sessions and event appends with
//! scoped state deltas. Sessions are keyed by `(app_name, user_id, id)`.

use agentgate_types::error::RepositoryError;
use agentgate_types::session::{Event, GetSessionConfig, Session, StateMap};

/// Repository trait for session and event persistence.
///
/// Implementations live in agentgate-infra (`RedisSessionRepository`,
/// `InMemorySessionRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait SessionRepository: Send + Sync {
    /// Create and store a new session.
    ///
    /// A missing or blank `session_id` is replaced by a v4 UUID. The initial
    /// `state` is split by scope like any state delta. The returned session
    /// has app and user state merged in.
    fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        state: Option<StateMap>,
        session_id: Option<&str>,
    ) -> impl std::future::Future<Output = Result<Session, RepositoryError>> + Send;

    /// Get a session with app and user state merged, or `None` if absent.
    fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
        config: Option<&GetSessionConfig>,
    ) -> impl std::future::Future<Output = Result<Option<Session>, RepositoryError>> + Send;

    /// List a user's sessions with events omitted.
    fn list_sessions(
        &self,
        app_name: &str,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Session>, RepositoryError>> + Send;

    /// Delete a session. Deleting a missing session is not an error.
    fn delete_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Append an event, applying its state delta by scope.
    ///
    /// Updates `session` in place (state, events, `last_update_time`) and
    /// persists the same change. `temp:` keys are applied to neither.
    fn append_event(
        &self,
        session: &mut Session,
        event: Event,
    ) -> impl std::future::Future<Output = Result<Event, RepositoryError>> + Send;
}
