//! Error types for context reduction

use thiserror::Error;

/// Context reduction error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("Reducer warm-up failed: {0}")]
    WarmUp(String),
}

/// Result type for context operations
pub type ContextResult<T> = Result<T, ContextError>;
