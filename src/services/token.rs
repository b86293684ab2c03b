//! Access token exchange
//!
//! Trades a long-lived key pair for a short-lived bearer token. Tokens are
//! fetched once per chat call and never cached.

use crate::models::upstream::TokenResponse;
use crate::utils::error::{AppError, AppResult, ErrorContext};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// OAuth client-credentials token client
#[derive(Debug, Clone)]
pub struct TokenClient {
    client: Client,
    token_url: String,
}

impl TokenClient {
    /// Create a token client for the given endpoint
    pub fn new(token_url: impl Into<String>, timeout_secs: u64) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("modelcompare/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            token_url: token_url.into(),
        })
    }

    /// Exchange `api_key`/`secret_key` for an access token
    pub async fn exchange(&self, api_key: &str, secret_key: &str) -> AppResult<String> {
        debug!("Requesting access token from {}", self.token_url);

        let response = self
            .client
            .get(&self.token_url)
            .query(&[
                ("grant_type", "client_credentials"),
                ("client_id", api_key),
                ("client_secret", secret_key),
            ])
            .send()
            .await
            .credential_context("Token request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .credential_context("Failed to read token response")?;

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            warn!("Token endpoint returned non-JSON body ({}): {}", status, e);
            AppError::Credential(format!("unexpected token response ({})", status))
        })?;

        match token.access_token {
            Some(access_token) if !access_token.is_empty() => {
                debug!("Access token obtained, expires_in={:?}", token.expires_in);
                Ok(access_token)
            }
            _ => {
                let reason = token
                    .error_description
                    .or(token.error)
                    .unwrap_or_else(|| "response has no access_token".to_string());
                warn!("Access token exchange failed: {}", reason);
                Err(AppError::Credential(reason))
            }
        }
    }
}
