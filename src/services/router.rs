//! Dispatch orchestrator
//!
//! Validates the requested provider and the configured secrets, then hands the
//! call to the matching adapter.

use crate::config::{AppConfig, Settings};
use crate::models::{ChatMessage, ProviderId, StreamEvent};
use crate::providers::{BoxStream, OpenAIProvider, Provider, UpstreamBody, WenxinProvider};
use crate::services::relay::{EventStream, StreamRelay};
use crate::services::session::ChatBackend;
use crate::utils::error::{AppError, AppResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Dispatcher
///
/// Holds one adapter per provider and the secrets they are called with
pub struct Dispatcher {
    settings: Settings,
    providers: HashMap<ProviderId, Arc<dyn Provider>>,
}

impl Dispatcher {
    /// Create a dispatcher with the built-in adapters
    pub fn new(settings: Settings, config: &AppConfig) -> Result<Self> {
        let timeout = settings.request.timeout;
        let stream_timeout = settings.request.stream_timeout;

        let mut providers: Vec<Arc<dyn Provider>> = Vec::with_capacity(ProviderId::ALL.len());
        for id in ProviderId::ALL {
            let provider_config = config.provider(id);
            let provider: Arc<dyn Provider> = match id {
                ProviderId::Doubao | ProviderId::DeepSeek => Arc::new(
                    OpenAIProvider::with_timeouts(id, provider_config, timeout, stream_timeout)
                        .with_context(|| format!("Failed to create {} provider", id))?,
                ),
                ProviderId::Wenxin => Arc::new(
                    WenxinProvider::with_timeouts(provider_config, timeout, stream_timeout)
                        .context("Failed to create wenxin provider")?,
                ),
            };
            providers.push(provider);
        }

        Ok(Self::with_providers(settings, providers))
    }

    /// Create a dispatcher over explicit adapters
    pub fn with_providers(settings: Settings, providers: Vec<Arc<dyn Provider>>) -> Self {
        let providers: HashMap<ProviderId, Arc<dyn Provider>> =
            providers.into_iter().map(|p| (p.id(), p)).collect();

        info!("Dispatcher initialized with {} providers", providers.len());

        let missing = settings.missing_credentials();
        if !missing.is_empty() {
            warn!("Provider secrets not configured: {}", missing.join(", "));
        }

        Self { settings, providers }
    }

    /// Start a call for the provider named by `model`
    ///
    /// The provider is validated first, then all secrets; no upstream request
    /// is made unless both pass.
    pub async fn dispatch(&self, model: &str, messages: &[ChatMessage]) -> AppResult<UpstreamBody> {
        let provider_id: ProviderId = model.parse()?;
        let credentials = self.settings.provider_credentials()?;

        let provider = self
            .providers
            .get(&provider_id)
            .ok_or_else(|| AppError::Internal(format!("No adapter registered for {}", provider_id)))?;

        debug!("Dispatching {} messages to {}", messages.len(), provider_id);

        provider
            .invoke(messages, &credentials.for_provider(provider_id))
            .await
    }

    /// Start a call and relay it as events
    ///
    /// A call-level failure becomes a single `Error` event.
    pub async fn open_events(&self, provider: ProviderId, messages: &[ChatMessage]) -> EventStream {
        match self.dispatch(provider.as_str(), messages).await {
            Ok(upstream) => Box::pin(StreamRelay::new(upstream.body)),
            Err(e) => {
                if e.is_call_level() {
                    warn!("{} call failed: {}", provider, e);
                } else {
                    error!("{} call rejected: {}", provider, e);
                }
                Box::pin(futures::stream::once(async move { StreamEvent::Error(e.to_string()) }))
            }
        }
    }
}

#[async_trait]
impl ChatBackend for Dispatcher {
    async fn open(
        &self,
        provider: ProviderId,
        messages: &[ChatMessage],
        _conversation_id: Option<&str>,
    ) -> AppResult<BoxStream<'static, Bytes>> {
        Ok(self.dispatch(provider.as_str(), messages).await?.body)
    }
}
