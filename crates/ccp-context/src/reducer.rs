//! Context reducer contract and implementations

use std::sync::OnceLock;

use tracing::{debug, trace};

use crate::error::{ContextError, ContextResult};
use crate::tokens::{count_tokens, truncate_tokens};

/// Default reduction budget in whitespace-delimited tokens.
pub const DEFAULT_MAX_TOKENS: usize = 128;

/// Strategy that shrinks conversation context before it is forwarded.
///
/// `query` is always supplied so retrieval-aware strategies can rank the
/// context against it; the truncating reference strategy ignores it.
pub trait ContextReducer: Send + Sync {
    fn name(&self) -> &'static str;

    /// One-time setup such as loading a ranking model. Run through
    /// [`Prepared`] so it happens at most once per process.
    fn warm_up(&self) -> ContextResult<()> {
        Ok(())
    }

    fn reduce(&self, query: &str, context: &str) -> String;
}

/// Keeps the first `max_tokens` tokens of the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncatingReducer {
    max_tokens: usize,
}

impl TruncatingReducer {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens }
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }
}

impl Default for TruncatingReducer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOKENS)
    }
}

impl ContextReducer for TruncatingReducer {
    fn name(&self) -> &'static str {
        "truncate"
    }

    fn reduce(&self, _query: &str, context: &str) -> String {
        let tokens = count_tokens(context);
        if tokens <= self.max_tokens {
            return context.to_string();
        }

        trace!(tokens, max_tokens = self.max_tokens, "truncating context");
        truncate_tokens(context, self.max_tokens)
    }
}

/// Wraps a reducer so its warm-up runs once, at construction, and the
/// outcome is cached for every later call.
#[derive(Debug)]
pub struct Prepared<R> {
    inner: R,
    warmed: OnceLock<Result<(), String>>,
}

impl<R: ContextReducer> Prepared<R> {
    pub fn new(inner: R) -> ContextResult<Self> {
        let prepared = Self {
            inner,
            warmed: OnceLock::new(),
        };
        prepared.prepare()?;
        debug!(reducer = prepared.inner.name(), "context reducer ready");
        Ok(prepared)
    }

    /// Runs the inner warm-up on first call; later calls return the cached
    /// outcome.
    pub fn prepare(&self) -> ContextResult<()> {
        self.warmed
            .get_or_init(|| self.inner.warm_up().map_err(|err| err.to_string()))
            .clone()
            .map_err(ContextError::WarmUp)
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: ContextReducer> ContextReducer for Prepared<R> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn warm_up(&self) -> ContextResult<()> {
        self.prepare()
    }

    fn reduce(&self, query: &str, context: &str) -> String {
        self.inner.reduce(query, context)
    }
}
