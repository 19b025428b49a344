//! Upstream implementations
//!
//! `OpenAIUpstream` forwards to any OpenAI-compatible Chat Completions API;
//! `StubUpstream` answers locally when no upstream credential is configured.

pub mod openai;
pub mod stub;

pub use openai::OpenAIUpstream;
pub use stub::StubUpstream;
