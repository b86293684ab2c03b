//! Application configuration settings
//!
//! Environment-driven settings: provider secrets, timeouts and logging

use crate::models::{Credential, ProviderId};
use crate::utils::error::{AppError, AppResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DOUBAO_API_KEY: &str = "DOUBAO_API_KEY";
pub const DEEPSEEK_API_KEY: &str = "DEEPSEEK_API_KEY";
pub const WENXIN_API_KEY: &str = "WENXIN_API_KEY";
pub const WENXIN_SECRET_KEY: &str = "WENXIN_SECRET_KEY";

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Provider secrets
    pub credentials: CredentialSettings,
    /// Request configuration
    pub request: RequestConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Provider secrets as read from the environment
///
/// All four may be absent at startup; every chat call fails until they are set.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialSettings {
    pub doubao_api_key: Option<String>,
    pub deepseek_api_key: Option<String>,
    pub wenxin_api_key: Option<String>,
    pub wenxin_secret_key: Option<String>,
}

impl std::fmt::Debug for CredentialSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "set" } else { "missing" };
        f.debug_struct("CredentialSettings")
            .field("doubao_api_key", &mask(&self.doubao_api_key))
            .field("deepseek_api_key", &mask(&self.deepseek_api_key))
            .field("wenxin_api_key", &mask(&self.wenxin_api_key))
            .field("wenxin_secret_key", &mask(&self.wenxin_secret_key))
            .finish()
    }
}

/// Request configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Maximum request size in bytes
    pub max_request_size: usize,
    /// Timeout for non-streaming calls (token exchange) in seconds
    pub timeout: u64,
    /// Timeout for a whole streamed completion in seconds
    pub stream_timeout: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (text/json)
    pub format: String,
}

/// Fully resolved secrets, available only when all four are configured
#[derive(Clone)]
pub struct ProviderCredentials {
    doubao_api_key: String,
    deepseek_api_key: String,
    wenxin_api_key: String,
    wenxin_secret_key: String,
}

impl ProviderCredentials {
    /// Credential handed to the given provider's adapter
    pub fn for_provider(&self, provider: ProviderId) -> Credential {
        match provider {
            ProviderId::Doubao => Credential::Bearer(self.doubao_api_key.clone()),
            ProviderId::DeepSeek => Credential::Bearer(self.deepseek_api_key.clone()),
            ProviderId::Wenxin => Credential::KeyPair {
                api_key: self.wenxin_api_key.clone(),
                secret_key: self.wenxin_secret_key.clone(),
            },
        }
    }
}

impl Settings {
    /// Create a new configuration instance from the process environment
    pub fn new() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup
    pub fn from_source<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let secret = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let settings = Self {
            credentials: CredentialSettings {
                doubao_api_key: secret(DOUBAO_API_KEY),
                deepseek_api_key: secret(DEEPSEEK_API_KEY),
                wenxin_api_key: secret(WENXIN_API_KEY),
                wenxin_secret_key: secret(WENXIN_SECRET_KEY),
            },
            request: RequestConfig {
                max_request_size: get_or_default("MAX_REQUEST_SIZE", "10485760")
                    .parse()
                    .context("Invalid maximum request size")?,
                timeout: get_or_default("REQUEST_TIMEOUT", "30")
                    .parse()
                    .context("Invalid request timeout")?,
                stream_timeout: get_or_default("STREAM_TIMEOUT", "300")
                    .parse()
                    .context("Invalid stream timeout")?,
            },
            logging: LoggingConfig {
                level: get_or_default("RUST_LOG", "info"),
                format: get_or_default("LOG_FORMAT", "text"),
            },
        };

        // Validate configuration
        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration validity
    fn validate(&self) -> Result<()> {
        // Validate timeout values
        if self.request.timeout == 0 || self.request.stream_timeout == 0 {
            anyhow::bail!("Timeout values cannot be 0");
        }

        // Validate request size limit
        if self.request.max_request_size == 0 {
            anyhow::bail!("Maximum request size cannot be 0");
        }

        // Secrets may carry no inner whitespace
        let keys = [
            &self.credentials.doubao_api_key,
            &self.credentials.deepseek_api_key,
            &self.credentials.wenxin_api_key,
            &self.credentials.wenxin_secret_key,
        ];
        if keys.iter().any(|k| k.as_deref().is_some_and(|v| v.contains(char::is_whitespace))) {
            anyhow::bail!("API keys cannot contain whitespace characters");
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }

        // Validate log format
        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!("Invalid log format: {}", self.logging.format);
        }

        Ok(())
    }

    /// Names of the secrets that are not configured
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let c = &self.credentials;
        [
            (DOUBAO_API_KEY, &c.doubao_api_key),
            (DEEPSEEK_API_KEY, &c.deepseek_api_key),
            (WENXIN_API_KEY, &c.wenxin_api_key),
            (WENXIN_SECRET_KEY, &c.wenxin_secret_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name)
        .collect()
    }

    /// Resolve all provider secrets, failing if any one is absent
    pub fn provider_credentials(&self) -> AppResult<ProviderCredentials> {
        let c = &self.credentials;
        match (&c.doubao_api_key, &c.deepseek_api_key, &c.wenxin_api_key, &c.wenxin_secret_key) {
            (Some(doubao), Some(deepseek), Some(wenxin_key), Some(wenxin_secret)) => Ok(ProviderCredentials {
                doubao_api_key: doubao.clone(),
                deepseek_api_key: deepseek.clone(),
                wenxin_api_key: wenxin_key.clone(),
                wenxin_secret_key: wenxin_secret.clone(),
            }),
            _ => Err(AppError::Configuration(self.missing_credentials().join(", "))),
        }
    }
}
