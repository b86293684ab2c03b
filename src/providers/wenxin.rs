//! Wenxin Provider implementation
//!
//! Wenxin authenticates with a key pair that is exchanged for an access token
//! on every call. The token travels as the `access_token` query parameter and
//! the model is selected by the endpoint path, so the body carries no model.
//!
//! Request errors come back as `200 application/json` with `error_code` and
//! `error_msg` instead of an error status; those are raised as upstream errors.

use super::{ensure_success, Provider, UpstreamBody};
use crate::config::ProviderConfig;
use crate::config::file::WENXIN_TOKEN_URL;
use crate::models::upstream::{WenxinChatRequest, WenxinErrorResponse};
use crate::models::{ChatMessage, Credential, ProviderId};
use crate::services::token::TokenClient;
use crate::utils::error::{AppError, AppResult, ErrorContext};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

/// Wenxin Provider
pub struct WenxinProvider {
    config: ProviderConfig,
    client: Client,
    tokens: TokenClient,
}

impl WenxinProvider {
    /// Create a provider with default timeouts
    pub fn new(config: ProviderConfig) -> AppResult<Self> {
        Self::with_timeouts(config, 30, 300)
    }

    /// Create a provider with custom timeouts
    pub fn with_timeouts(config: ProviderConfig, timeout_secs: u64, stream_timeout_secs: u64) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(timeout_secs))
            .timeout(Duration::from_secs(stream_timeout_secs))
            .user_agent(concat!("modelcompare/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let token_url = config.token_url.as_deref().unwrap_or(WENXIN_TOKEN_URL);
        let tokens = TokenClient::new(token_url, timeout_secs)?;

        Ok(Self { config, client, tokens })
    }

    fn key_pair<'a>(&self, credential: &'a Credential) -> AppResult<(&'a str, &'a str)> {
        match credential {
            Credential::KeyPair { api_key, secret_key } => Ok((api_key.as_str(), secret_key.as_str())),
            Credential::Bearer(_) => Err(AppError::Configuration(
                "wenxin expects an API key and secret key pair".to_string(),
            )),
        }
    }
}

/// Whether a response advertises a plain JSON body rather than an event stream
fn is_json_response(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false)
}

#[async_trait]
impl Provider for WenxinProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Wenxin
    }

    async fn invoke(&self, messages: &[ChatMessage], credential: &Credential) -> AppResult<UpstreamBody> {
        let (api_key, secret_key) = self.key_pair(credential)?;
        let access_token = self.tokens.exchange(api_key, secret_key).await?;

        debug!("Sending wenxin streaming chat request: messages={}", messages.len());

        let request = WenxinChatRequest { messages, stream: true };

        let response = self
            .client
            .post(self.config.chat_url())
            .query(&[("access_token", access_token.as_str())])
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&request)
            .send()
            .await
            .transport_context("Failed to send wenxin streaming request")?;

        let response = ensure_success(ProviderId::Wenxin, response).await?;

        if !is_json_response(&response) {
            return Ok(UpstreamBody::from_response(response));
        }

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .transport_context("Failed to read wenxin response")?;

        let record = frame_json_reply(status, &body)?;
        debug!("wenxin answered with a single JSON reply, relaying it as one record");

        let chunk: AppResult<Bytes> = Ok(record);
        Ok(UpstreamBody {
            status,
            body: Box::pin(futures::stream::once(async move { chunk })),
        })
    }
}

/// Turn a non-stream JSON reply into one `data: ` record
///
/// An `error_code` body is an upstream error. A body with a string `result`
/// is re-serialized onto a single line so the relay reads it like any other
/// stream record. Anything else is rejected.
fn frame_json_reply(status: u16, body: &[u8]) -> AppResult<Bytes> {
    if let Ok(err) = serde_json::from_slice::<WenxinErrorResponse>(body) {
        error!("wenxin API error: {} (error_code {})", err.error_msg, err.error_code);
        return Err(AppError::Upstream {
            provider: ProviderId::Wenxin,
            status,
            message: format!("{} (error_code {})", err.error_msg, err.error_code),
        });
    }

    let unexpected = |detail: &str| AppError::Upstream {
        provider: ProviderId::Wenxin,
        status,
        message: format!("Unexpected non-stream response: {}", detail),
    };

    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| unexpected("body is not valid JSON"))?;
    if !value.get("result").map(serde_json::Value::is_string).unwrap_or(false) {
        return Err(unexpected("no result field"));
    }

    let line = serde_json::to_string(&value).map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Bytes::from(format!("data: {}\n", line)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = WenxinProvider::new(ProviderConfig::default_for(ProviderId::Wenxin)).unwrap();
        assert_eq!(provider.id(), ProviderId::Wenxin);
    }

    #[test]
    fn test_key_pair_required() {
        let provider = WenxinProvider::new(ProviderConfig::default_for(ProviderId::Wenxin)).unwrap();

        let pair = Credential::KeyPair {
            api_key: "ak".to_string(),
            secret_key: "sk".to_string(),
        };
        assert_eq!(provider.key_pair(&pair).unwrap(), ("ak", "sk"));

        let bearer = Credential::Bearer("x".to_string());
        assert!(matches!(provider.key_pair(&bearer), Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_frame_json_reply() {
        let body = b"{\n  \"id\": \"as-1\",\n  \"result\": \"\xe4\xbd\xa0\xe5\xa5\xbd\"\n}";
        let record = frame_json_reply(200, body).unwrap();
        let text = std::str::from_utf8(&record).unwrap();
        assert!(text.starts_with("data: {"));
        assert!(text.ends_with("}\n"));
        assert_eq!(text.matches('\n').count(), 1);
        assert!(text.contains("\"result\":\"你好\""));
    }

    #[test]
    fn test_frame_json_reply_rejects_unknown_body() {
        let err = frame_json_reply(200, br#"{"id":"as-1"}"#).unwrap_err();
        assert!(matches!(err, AppError::Upstream { status: 200, ref message, .. } if message.contains("no result field")));

        let err = frame_json_reply(200, br#"{"error_code":18,"error_msg":"QPS limit"}"#).unwrap_err();
        assert!(err.to_string().contains("QPS limit (error_code 18)"));
    }
}
