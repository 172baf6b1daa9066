//! MemoryRepository trait definition.
//!
//! Memory is an archive of whole sessions per `(app_name, user_id)`, searched
//! by keyword. Follows the same RPITIT pattern as `SessionRepository`.

use agentgate_types::error::RepositoryError;
use agentgate_types::memory::SearchMemoryResponse;
use agentgate_types::session::Session;

/// Repository trait for cross-session memory.
///
/// Implementations live in agentgate-infra (`RedisMemoryRepository`,
/// `InMemoryMemoryRepository`).
pub trait MemoryRepository: Send + Sync {
    /// Store the session's events that carry content parts, replacing any
    /// earlier snapshot of the same session. Sessions with no such events
    /// are skipped.
    fn add_session_to_memory(
        &self,
        session: &Session,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Every stored text event sharing at least one word with `query`,
    /// newest first.
    fn search_memory(
        &self,
        app_name: &str,
        user_id: &str,
        query: &str,
    ) -> impl std::future::Future<Output = Result<SearchMemoryResponse, RepositoryError>> + Send;
}
