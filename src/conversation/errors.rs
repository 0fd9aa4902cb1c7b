//! Error types for the conversation store.

use thiserror::Error;

/// Conversation store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No conversation exists for the id.
    #[error("conversation not found: {0}")]
    NotFound(String),
}

/// Convenience result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
