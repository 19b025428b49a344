//! Whitespace tokenization and token accounting

/// Number of whitespace-delimited tokens in `text`.
pub fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// First `limit` whitespace-delimited tokens of `text`, joined by single spaces.
pub fn truncate_tokens(text: &str, limit: usize) -> String {
    text.split_whitespace()
        .take(limit)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Token counts of one request before and after reduction.
///
/// Both sides include the query, so `saved()` only reflects what the reducer
/// removed from the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub before: usize,
    pub after: usize,
}

impl TokenUsage {
    pub fn measure(query: &str, context: &str, reduced_context: &str) -> Self {
        let query_tokens = count_tokens(query);
        Self {
            before: count_tokens(context) + query_tokens,
            after: count_tokens(reduced_context) + query_tokens,
        }
    }

    pub fn saved(&self) -> usize {
        self.before.saturating_sub(self.after)
    }
}
