//! Data models module
//!
//! Defines the canonical chat types, provider identifiers and the
//! upstream request/response shapes of the three providers

pub mod chat;
pub mod provider;
pub mod upstream;

pub use chat::{ChatMessage, ChatRequest, Role, StreamEvent};
pub use provider::{Credential, ProviderId};
