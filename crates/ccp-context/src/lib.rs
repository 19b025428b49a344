//! CCP Context Reduction - shrinking conversation context under a token budget
//!
//! This crate provides:
//! - Whitespace token counting and usage accounting
//! - The `ContextReducer` contract and its truncating reference strategy
//! - A once-only warm-up wrapper for reducers with expensive setup

pub mod error;
pub mod reducer;
pub mod tokens;

pub use error::{ContextError, ContextResult};
pub use reducer::{ContextReducer, Prepared, TruncatingReducer, DEFAULT_MAX_TOKENS};
pub use tokens::{count_tokens, truncate_tokens, TokenUsage};

/// Prelude for common imports
pub mod prelude {
    pub use crate::error::{ContextError, ContextResult};
    pub use crate::reducer::{ContextReducer, Prepared, TruncatingReducer};
    pub use crate::tokens::TokenUsage;
}
