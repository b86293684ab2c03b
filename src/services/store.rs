//! Conversation store
//!
//! Where the compare session records conversations and their messages.
//! [`MemoryStore`] keeps everything in process memory.

use crate::models::{ProviderId, Role};
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// One recorded message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: Role,
    pub content: String,
    /// Provider that produced an assistant message; `None` for user messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderId>,
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            provider: None,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(provider: ProviderId, content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            provider: Some(provider),
            created_at: Utc::now(),
        }
    }
}

/// Persistence seam for conversations
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create an empty conversation and return its id
    async fn create_conversation(&self) -> AppResult<String>;

    /// Append a message to an existing conversation
    async fn append(&self, conversation_id: &str, message: StoredMessage) -> AppResult<()>;

    /// All messages of a conversation, oldest first
    async fn messages(&self, conversation_id: &str) -> AppResult<Vec<StoredMessage>>;
}

/// In-memory conversation store
#[derive(Debug, Default)]
pub struct MemoryStore {
    conversations: RwLock<HashMap<String, Vec<StoredMessage>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of conversations created so far
    pub fn len(&self) -> usize {
        self.conversations.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> AppError {
    AppError::Internal("conversation store lock poisoned".to_string())
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn create_conversation(&self) -> AppResult<String> {
        let id = Uuid::new_v4().to_string();
        self.conversations
            .write()
            .map_err(poisoned)?
            .insert(id.clone(), Vec::new());

        debug!("Created conversation {}", id);
        Ok(id)
    }

    async fn append(&self, conversation_id: &str, message: StoredMessage) -> AppResult<()> {
        let mut conversations = self.conversations.write().map_err(poisoned)?;
        let messages = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| AppError::Internal(format!("Unknown conversation: {}", conversation_id)))?;
        messages.push(message);
        Ok(())
    }

    async fn messages(&self, conversation_id: &str) -> AppResult<Vec<StoredMessage>> {
        let conversations = self.conversations.read().map_err(poisoned)?;
        conversations
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("Unknown conversation: {}", conversation_id)))
    }
}
