//! Canonical chat data models
//!
//! These types are shared by every provider adapter and by the compare session

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Request body accepted by `POST /chat-with-models`
///
/// `model` is kept as a plain string so an unknown provider surfaces as
/// an invalid-provider error rather than a body parse error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation history, oldest first
    pub messages: Vec<ChatMessage>,
    /// Provider wire id ("doubao", "deepseek", "wenxin")
    pub model: String,
    /// Conversation the turn belongs to (informational for the proxy)
    #[serde(rename = "conversationId", default)]
    pub conversation_id: Option<String>,
}

/// One item of a relayed provider stream
///
/// A well-formed sequence is any number of `TokenFragment`s followed by
/// exactly one `End` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental piece of generated text
    TokenFragment(String),
    /// Upstream closed the stream normally
    End,
    /// Stream failed; nothing follows
    Error(String),
}

impl StreamEvent {
    /// Whether this event closes the sequence
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::End | StreamEvent::Error(_))
    }

    pub fn as_fragment(&self) -> Option<&str> {
        match self {
            StreamEvent::TokenFragment(text) => Some(text.as_str()),
            _ => None,
        }
    }
}
