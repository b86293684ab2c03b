//! Provider module
//!
//! Defines the Provider trait and the upstream adapters

pub mod openai;
pub mod wenxin;

use crate::models::upstream::upstream_error_message;
use crate::models::{ChatMessage, Credential, ProviderId};
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::pin::Pin;
use tokio_stream::{Stream, StreamExt};
use tracing::error;

/// A boxed stream of fallible items
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = AppResult<T>> + Send + 'a>>;

/// An accepted upstream response whose body has not been read yet
pub struct UpstreamBody {
    /// HTTP status the provider answered with (always 2xx)
    pub status: u16,
    /// Raw event-stream bytes
    pub body: BoxStream<'static, Bytes>,
}

impl std::fmt::Debug for UpstreamBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamBody")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl UpstreamBody {
    /// Wrap a reqwest response body, mapping read failures to transport errors
    pub fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| AppError::Transport(format!("Stream error: {}", e))));

        Self {
            status,
            body: Box::pin(body),
        }
    }
}

/// Turn a non-2xx provider response into an upstream error
pub(crate) async fn ensure_success(provider: ProviderId, response: reqwest::Response) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    error!("{} API request failed: {} - {}", provider, status, error_text);

    Err(AppError::Upstream {
        provider,
        status: status.as_u16(),
        message: upstream_error_message(&error_text),
    })
}

/// Provider trait for upstream chat APIs
///
/// An adapter issues exactly one streaming request per call and hands back the
/// body without consuming it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider served by this adapter
    fn id(&self) -> ProviderId;

    /// Start a streaming chat completion
    async fn invoke(&self, messages: &[ChatMessage], credential: &Credential) -> AppResult<UpstreamBody>;
}

pub use openai::OpenAIProvider;
pub use wenxin::WenxinProvider;
