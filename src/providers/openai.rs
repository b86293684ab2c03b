//! OpenAI-compatible Provider implementation
//!
//! Serves the providers that speak the OpenAI chat completions dialect with a
//! static bearer key (Doubao, DeepSeek).

use super::{ensure_success, Provider, UpstreamBody};
use crate::config::ProviderConfig;
use crate::models::upstream::ChatCompletionRequest;
use crate::models::{ChatMessage, Credential, ProviderId};
use crate::utils::error::{AppError, AppResult, ErrorContext};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// OpenAI-compatible Provider
pub struct OpenAIProvider {
    id: ProviderId,
    config: ProviderConfig,
    client: Client,
}

impl OpenAIProvider {
    /// Create a provider with default timeouts
    pub fn new(id: ProviderId, config: ProviderConfig) -> AppResult<Self> {
        Self::with_timeouts(id, config, 30, 300)
    }

    /// Create a provider with custom timeouts
    ///
    /// `timeout_secs` bounds connection setup, `stream_timeout_secs` the whole
    /// streamed exchange.
    pub fn with_timeouts(
        id: ProviderId,
        config: ProviderConfig,
        timeout_secs: u64,
        stream_timeout_secs: u64,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(timeout_secs))
            .timeout(Duration::from_secs(stream_timeout_secs))
            .user_agent(concat!("modelcompare/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { id, config, client })
    }

    /// Upstream model name sent in every request
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Build the request URL
    fn build_url(&self) -> String {
        self.config.chat_url()
    }

    /// Build authorization header value
    fn auth_header(&self, credential: &Credential) -> AppResult<String> {
        match credential {
            Credential::Bearer(key) => Ok(format!("Bearer {}", key)),
            Credential::KeyPair { .. } => Err(AppError::Configuration(format!(
                "{} expects a bearer key, got a key pair",
                self.id
            ))),
        }
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn invoke(&self, messages: &[ChatMessage], credential: &Credential) -> AppResult<UpstreamBody> {
        let auth = self.auth_header(credential)?;
        let url = self.build_url();

        debug!(
            "Sending {} streaming chat request: model={}, messages={}",
            self.id,
            self.config.model,
            messages.len()
        );

        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            stream: true,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", &auth)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&request)
            .send()
            .await
            .transport_context(&format!("Failed to send {} streaming request", self.id))?;

        let response = ensure_success(self.id, response).await?;
        debug!("{} accepted streaming request: {}", self.id, response.status());

        Ok(UpstreamBody::from_response(response))
    }
}
