//! CCP protocol types for the OpenAI-compatible chat-completion surface.
//!
//! This crate implements:
//! - the inbound request envelope (`ChatCompletionRequest`), preserving any
//!   fields the proxy does not interpret
//! - the query/context split of a conversation (`Conversation`)
//! - the rewrite into the two-message payload forwarded upstream
//! - the stub completion body served when no upstream is configured

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

pub const ROLE_SYSTEM: &str = "system";
pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

/// Content of the assistant message in the stub completion.
pub const STUB_CONTENT: &str = "[stubbed response]";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error("messages field required")]
    MissingMessages,
}

/// A single chat message. Fields other than `role` and `content` are kept in
/// `extra` and serialized back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            extra: Map::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ROLE_SYSTEM, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ROLE_USER, content)
    }
}

/// Inbound chat-completion request. Everything except `messages` (model,
/// temperature, ...) lives in `extra` and is forwarded as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub messages: Vec<ChatMessage>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ChatMessage>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<ChatMessage>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A conversation split into its final query message and the space-joined
/// content of everything before it.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation<'a> {
    pub query: &'a ChatMessage,
    pub context: String,
}

impl ChatCompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            extra: Map::new(),
        }
    }

    /// Parse a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(body).map_err(|err| ProtocolError::InvalidBody(err.to_string()))
    }

    /// Split the message list into query and context.
    pub fn conversation(&self) -> Result<Conversation<'_>, ProtocolError> {
        let (query, earlier) = self
            .messages
            .split_last()
            .ok_or(ProtocolError::MissingMessages)?;

        let context = earlier
            .iter()
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Conversation { query, context })
    }

    /// Replace all context messages with one system message carrying
    /// `reduced_context`, keeping the final message as is.
    pub fn into_reduced(mut self, reduced_context: String) -> Result<Self, ProtocolError> {
        let query = self.messages.pop().ok_or(ProtocolError::MissingMessages)?;
        self.messages = vec![ChatMessage::system(reduced_context), query];
        Ok(self)
    }
}

/// Body returned when the proxy runs without an upstream credential.
pub fn stub_completion() -> Value {
    json!({
        "choices": [
            {
                "message": {
                    "role": ROLE_ASSISTANT,
                    "content": STUB_CONTENT,
                }
            }
        ]
    })
}
