//! Error types for the session-level admin operations.

/// Errors from the chat engine.
///
/// [`ChatOrchestrator::handle`](crate::ChatOrchestrator::handle) never returns
/// these; every per-message failure becomes a reply. They surface only from
/// the session inspection and lifecycle calls.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("storage error: {0}")]
    StorageError(String),
}
