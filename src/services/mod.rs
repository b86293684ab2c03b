//! Business logic services module
//!
//! Dispatch, stream relaying, token exchange and the compare session

pub mod client;
pub mod relay;
pub mod router;
pub mod session;
pub mod store;
pub mod token;

pub use client::RemoteChatClient;
pub use relay::{EventStream, RecordDecoder, StreamRelay, Utf8Decoder};
pub use router::Dispatcher;
pub use session::{ChatBackend, CompareSession, PaneOutcome, PaneState, TurnSummary, ERROR_REPLY};
pub use store::{ConversationStore, MemoryStore, StoredMessage};
pub use token::TokenClient;
