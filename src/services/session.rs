//! Compare session
//!
//! Drives one prompt against all three providers side by side. Each provider
//! owns a [`PaneState`]; a turn appends the user message to every pane and then
//! streams the three replies concurrently. A failure in one pane never touches
//! the other two.
//!
//! `send` holds the session for the whole turn, so live progress is published
//! per pane on a [`watch`] channel: every fragment and every terminal event
//! replaces the observed [`PaneState`].

use crate::models::{ChatMessage, ProviderId, StreamEvent};
use crate::providers::BoxStream;
use crate::services::relay::StreamRelay;
use crate::services::store::{ConversationStore, StoredMessage};
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Reply shown in a pane whose call failed
pub const ERROR_REPLY: &str = "An error occurred, please try again later.";

/// Something that can open a streaming chat call for one provider
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Open a call and return the raw event-stream body
    async fn open(
        &self,
        provider: ProviderId,
        messages: &[ChatMessage],
        conversation_id: Option<&str>,
    ) -> AppResult<BoxStream<'static, Bytes>>;
}

/// Per-provider view state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaneState {
    pub messages: Vec<ChatMessage>,
    pub is_loading: bool,
    /// Text received so far for the reply in flight
    pub streaming_content: String,
}

/// How one pane's call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneOutcome {
    Completed { content: String },
    Failed { error: String },
}

impl PaneOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PaneOutcome::Completed { .. })
    }
}

/// Result of one [`CompareSession::send`]
#[derive(Debug, Clone)]
pub struct TurnSummary {
    pub conversation_id: String,
    pub outcomes: [(ProviderId, PaneOutcome); 3],
}

impl TurnSummary {
    pub fn outcome(&self, provider: ProviderId) -> &PaneOutcome {
        &self.outcomes[provider.index()].1
    }
}

/// Side-by-side chat session over the three providers
pub struct CompareSession {
    backend: Arc<dyn ChatBackend>,
    store: Arc<dyn ConversationStore>,
    conversation_id: Option<String>,
    panes: [PaneState; 3],
    observers: [watch::Sender<PaneState>; 3],
}

impl CompareSession {
    pub fn new(backend: Arc<dyn ChatBackend>, store: Arc<dyn ConversationStore>) -> Self {
        Self {
            backend,
            store,
            conversation_id: None,
            panes: Default::default(),
            observers: std::array::from_fn(|_| watch::channel(PaneState::default()).0),
        }
    }

    /// Follow one pane while a turn is running
    ///
    /// The receiver always holds the latest state; intermediate states may be
    /// skipped by a slow reader.
    pub fn watch(&self, provider: ProviderId) -> watch::Receiver<PaneState> {
        self.observers[provider.index()].subscribe()
    }

    pub fn pane(&self, provider: ProviderId) -> &PaneState {
        &self.panes[provider.index()]
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Whether any pane is still waiting for its reply
    pub fn is_busy(&self) -> bool {
        self.panes.iter().any(|p| p.is_loading)
    }

    /// Reset every pane and start a fresh conversation on the next send
    pub fn clear(&mut self) {
        self.panes = Default::default();
        self.conversation_id = None;
        for observer in &self.observers {
            observer.send_replace(PaneState::default());
        }
        debug!("Compare session cleared");
    }

    /// Send one user message to all three providers
    pub async fn send(&mut self, input: &str) -> AppResult<TurnSummary> {
        let content = input.trim();
        if content.is_empty() {
            return Err(AppError::InvalidRequest("message is empty".to_string()));
        }

        let conversation_id = match &self.conversation_id {
            Some(id) => id.clone(),
            None => {
                let id = self.store.create_conversation().await?;
                self.conversation_id = Some(id.clone());
                id
            }
        };

        if let Err(e) = self.store.append(&conversation_id, StoredMessage::user(content)).await {
            warn!("Failed to record user message: {}", e);
        }

        let user_message = ChatMessage::user(content);
        for (pane, observer) in self.panes.iter_mut().zip(&self.observers) {
            pane.messages.push(user_message.clone());
            pane.is_loading = true;
            observer.send_replace(pane.clone());
        }

        info!("Sending turn to {} providers, conversation={}", self.panes.len(), conversation_id);

        let backend = self.backend.as_ref();
        let store = self.store.as_ref();
        let id = conversation_id.as_str();
        let [doubao, deepseek, wenxin] = &mut self.panes;
        let [doubao_tx, deepseek_tx, wenxin_tx] = &self.observers;

        let (a, b, c) = tokio::join!(
            run_pane(backend, store, id, ProviderId::Doubao, PaneSlot::new(doubao, doubao_tx)),
            run_pane(backend, store, id, ProviderId::DeepSeek, PaneSlot::new(deepseek, deepseek_tx)),
            run_pane(backend, store, id, ProviderId::Wenxin, PaneSlot::new(wenxin, wenxin_tx)),
        );

        Ok(TurnSummary {
            conversation_id,
            outcomes: [
                (ProviderId::Doubao, a),
                (ProviderId::DeepSeek, b),
                (ProviderId::Wenxin, c),
            ],
        })
    }
}

/// One pane plus the channel its progress is published on
struct PaneSlot<'a> {
    state: &'a mut PaneState,
    observer: &'a watch::Sender<PaneState>,
}

impl<'a> PaneSlot<'a> {
    fn new(state: &'a mut PaneState, observer: &'a watch::Sender<PaneState>) -> Self {
        Self { state, observer }
    }

    fn publish(&self) {
        self.observer.send_replace(self.state.clone());
    }

    fn fail(&mut self, error: String) -> PaneOutcome {
        self.state.streaming_content.clear();
        self.state.messages.push(ChatMessage::assistant(ERROR_REPLY));
        self.state.is_loading = false;
        self.publish();
        PaneOutcome::Failed { error }
    }
}

/// Run one provider call to completion, updating only its own pane
async fn run_pane(
    backend: &dyn ChatBackend,
    store: &dyn ConversationStore,
    conversation_id: &str,
    provider: ProviderId,
    mut pane: PaneSlot<'_>,
) -> PaneOutcome {
    let body = match backend.open(provider, &pane.state.messages, Some(conversation_id)).await {
        Ok(body) => body,
        Err(e) => {
            warn!("{} call failed: {}", provider, e);
            return pane.fail(e.to_string());
        }
    };

    let mut events = StreamRelay::new(body);
    while let Some(event) = events.next().await {
        match event {
            StreamEvent::TokenFragment(text) => {
                pane.state.streaming_content.push_str(&text);
                pane.publish();
            }
            StreamEvent::End => break,
            StreamEvent::Error(error) => {
                warn!("{} stream failed: {}", provider, error);
                return pane.fail(error);
            }
        }
    }

    let content = std::mem::take(&mut pane.state.streaming_content);
    if !content.is_empty() {
        let message = StoredMessage::assistant(provider, content.clone());
        if let Err(e) = store.append(conversation_id, message).await {
            warn!("Failed to record {} reply: {}", provider, e);
        }
    }

    debug!("{} reply complete: {} chars", provider, content.chars().count());
    pane.state.messages.push(ChatMessage::assistant(content.clone()));
    pane.state.is_loading = false;
    pane.publish();

    PaneOutcome::Completed { content }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::MemoryStore;
    use tokio::sync::Notify;

    struct FixedBackend;

    #[async_trait]
    impl ChatBackend for FixedBackend {
        async fn open(
            &self,
            provider: ProviderId,
            _messages: &[ChatMessage],
            _conversation_id: Option<&str>,
        ) -> AppResult<BoxStream<'static, Bytes>> {
            if provider == ProviderId::Wenxin {
                return Err(AppError::Credential("bad key".to_string()));
            }
            let line = format!("data: {{\"result\":\"hi from {}\"}}\n", provider);
            let chunk: AppResult<Bytes> = Ok(Bytes::from(line));
            Ok(Box::pin(futures::stream::iter(vec![chunk])))
        }
    }

    /// Doubao sends "He", then waits for the gate before sending "llo"
    struct GatedBackend(Arc<Notify>);

    #[async_trait]
    impl ChatBackend for GatedBackend {
        async fn open(
            &self,
            provider: ProviderId,
            _messages: &[ChatMessage],
            _conversation_id: Option<&str>,
        ) -> AppResult<BoxStream<'static, Bytes>> {
            if provider != ProviderId::Doubao {
                let chunk: AppResult<Bytes> = Ok(Bytes::from_static(b"data: {\"result\":\"ok\"}\n"));
                return Ok(Box::pin(futures::stream::iter(vec![chunk])));
            }

            let gate = self.0.clone();
            let first: AppResult<Bytes> = Ok(Bytes::from_static(b"data: {\"result\":\"He\"}\n"));
            let rest = futures::stream::once(async move {
                gate.notified().await;
                let chunk: AppResult<Bytes> = Ok(Bytes::from_static(b"data: {\"result\":\"llo\"}\n"));
                chunk
            });
            Ok(Box::pin(futures::stream::iter(vec![first]).chain(rest)))
        }
    }

    #[tokio::test]
    async fn test_watch_sees_fragments_while_streaming() {
        let gate = Arc::new(Notify::new());
        let mut session = CompareSession::new(Arc::new(GatedBackend(gate.clone())), Arc::new(MemoryStore::new()));
        let mut doubao = session.watch(ProviderId::Doubao);

        let observe = async {
            let partial = doubao
                .wait_for(|pane| pane.streaming_content == "He")
                .await
                .unwrap()
                .clone();
            gate.notify_one();
            partial
        };

        let (summary, partial) = tokio::join!(session.send("hi"), observe);

        assert!(partial.is_loading);
        assert_eq!(partial.messages, vec![ChatMessage::user("hi")]);

        let summary = summary.unwrap();
        assert_eq!(
            summary.outcome(ProviderId::Doubao),
            &PaneOutcome::Completed { content: "Hello".to_string() }
        );

        let done = doubao.borrow().clone();
        assert!(!done.is_loading);
        assert!(done.streaming_content.is_empty());
        assert_eq!(done.messages.last(), Some(&ChatMessage::assistant("Hello")));
        assert_eq!(&done, session.pane(ProviderId::Doubao));
    }

    #[tokio::test]
    async fn test_watch_reports_failure_and_clear() {
        let mut session = CompareSession::new(Arc::new(FixedBackend), Arc::new(MemoryStore::new()));
        let wenxin = session.watch(ProviderId::Wenxin);

        session.send("hello").await.unwrap();
        {
            let state = wenxin.borrow();
            assert!(!state.is_loading);
            assert_eq!(state.messages.last(), Some(&ChatMessage::assistant(ERROR_REPLY)));
        }

        session.clear();
        assert_eq!(*wenxin.borrow(), PaneState::default());
    }

    #[tokio::test]
    async fn test_send_rejects_blank_input() {
        let mut session = CompareSession::new(Arc::new(FixedBackend), Arc::new(MemoryStore::new()));
        assert!(matches!(session.send("   ").await, Err(AppError::InvalidRequest(_))));
        assert!(session.conversation_id().is_none());
    }

    #[tokio::test]
    async fn test_failed_pane_gets_substitute_reply() {
        let mut session = CompareSession::new(Arc::new(FixedBackend), Arc::new(MemoryStore::new()));
        let summary = session.send(" hello ").await.unwrap();

        assert!(summary.outcome(ProviderId::Doubao).is_completed());
        assert!(!summary.outcome(ProviderId::Wenxin).is_completed());

        let doubao = session.pane(ProviderId::Doubao);
        assert_eq!(doubao.messages[0], ChatMessage::user("hello"));
        assert_eq!(doubao.messages[1], ChatMessage::assistant("hi from doubao"));

        let wenxin = session.pane(ProviderId::Wenxin);
        assert_eq!(wenxin.messages[1], ChatMessage::assistant(ERROR_REPLY));
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_clear_resets_panes() {
        let mut session = CompareSession::new(Arc::new(FixedBackend), Arc::new(MemoryStore::new()));
        session.send("hello").await.unwrap();
        assert!(session.conversation_id().is_some());

        session.clear();
        assert!(session.conversation_id().is_none());
        for id in ProviderId::ALL {
            assert_eq!(session.pane(id), &PaneState::default());
        }
    }
}
