//! HTTP client service
//!
//! Talks to a running proxy over `POST /chat-with-models`, so a compare
//! session can run against a remote deployment instead of in-process.

use crate::models::{ChatMessage, ChatRequest, ProviderId};
use crate::providers::BoxStream;
use crate::services::session::ChatBackend;
use crate::utils::error::{AppError, AppResult, ErrorContext, ErrorResponse};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

/// Client for a remote chat proxy
#[derive(Debug, Clone)]
pub struct RemoteChatClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl RemoteChatClient {
    /// Create a client for the proxy at `base_url`
    pub fn new(base_url: impl Into<String>, stream_timeout_secs: u64) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(stream_timeout_secs))
            .user_agent(concat!("modelcompare/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every call
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/chat-with-models", self.base_url)
    }

    /// Open a streaming call for one provider
    pub async fn chat_stream(
        &self,
        provider: ProviderId,
        messages: &[ChatMessage],
        conversation_id: Option<&str>,
    ) -> AppResult<BoxStream<'static, Bytes>> {
        let request = ChatRequest {
            messages: messages.to_vec(),
            model: provider.as_str().to_string(),
            conversation_id: conversation_id.map(str::to_string),
        };

        debug!("Sending remote {} request to {}", provider, self.chat_url());

        let mut builder = self
            .client
            .post(self.chat_url())
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(token) = &self.auth_token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let response = builder
            .send()
            .await
            .transport_context("Failed to reach chat proxy")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);

            error!("Chat proxy request failed: {} - {}", status, message);
            return Err(AppError::Upstream {
                provider,
                status: status.as_u16(),
                message,
            });
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| AppError::Transport(format!("Stream error: {}", e))));

        Ok(Box::pin(stream))
    }

    /// Check that the proxy is up
    pub async fn health_check(&self) -> AppResult<bool> {
        let url = format!("{}/health", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                info!("Chat proxy health check passed");
                Ok(true)
            }
            Ok(response) => {
                warn!("Chat proxy health check failed: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Chat proxy health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl ChatBackend for RemoteChatClient {
    async fn open(
        &self,
        provider: ProviderId,
        messages: &[ChatMessage],
        conversation_id: Option<&str>,
    ) -> AppResult<BoxStream<'static, Bytes>> {
        self.chat_stream(provider, messages, conversation_id).await
    }
}
