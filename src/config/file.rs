//! File-based configuration loading
//!
//! Loads server and provider endpoint configuration from an optional JSON file

use crate::models::ProviderId;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

pub const DOUBAO_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
pub const WENXIN_BASE_URL: &str = "https://aip.baidubce.com/rpc/2.0/ai_custom/v1/wenxinworkshop";
pub const WENXIN_TOKEN_URL: &str = "https://aip.baidubce.com/oauth/2.0/token";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen host (default: "127.0.0.1" - localhost only)
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port (default: 8082)
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8082
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Application configuration loaded from JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration (optional, defaults to localhost:8082)
    #[serde(default)]
    pub server: ServerConfig,

    /// Per-provider endpoint overrides; absent providers use built-in endpoints
    #[serde(default)]
    pub providers: HashMap<ProviderId, ProviderConfig>,
}

/// Provider endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL; `/chat/completions` is appended
    #[serde(rename = "baseUrl")]
    pub base_url: String,

    /// Canonical upstream model name
    pub model: String,

    /// OAuth token endpoint, for providers that exchange a key pair
    #[serde(rename = "tokenUrl", default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
}

impl ProviderConfig {
    /// Built-in endpoint for a provider
    pub fn default_for(provider: ProviderId) -> Self {
        match provider {
            ProviderId::Doubao => Self {
                base_url: DOUBAO_BASE_URL.to_string(),
                model: "doubao-pro-32k".to_string(),
                token_url: None,
            },
            ProviderId::DeepSeek => Self {
                base_url: DEEPSEEK_BASE_URL.to_string(),
                model: "deepseek-chat".to_string(),
                token_url: None,
            },
            ProviderId::Wenxin => Self {
                base_url: WENXIN_BASE_URL.to_string(),
                model: "ERNIE-Bot-4".to_string(),
                token_url: Some(WENXIN_TOKEN_URL.to_string()),
            },
        }
    }

    /// Full chat completions URL
    pub fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading configuration from: {:?}", path);

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| "Failed to parse config JSON")?;

        config.validate()?;

        debug!("Loaded {} provider overrides", config.providers.len());
        Ok(config)
    }

    /// Load configuration from default locations
    /// Searches in order:
    /// 1. ~/.config/modelcompare/modelcompare.json
    /// 2. ./modelcompare.json
    ///
    /// Falls back to built-in endpoints when no file is found.
    pub fn load_default() -> Result<Self> {
        // Try home config directory first
        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".config").join("modelcompare").join("modelcompare.json");
            if config_path.exists() {
                return Self::load(&config_path);
            }
        }

        // Try current directory
        let local_path = Path::new("modelcompare.json");
        if local_path.exists() {
            return Self::load(local_path);
        }

        info!("No configuration file found, using built-in provider endpoints");
        Ok(Self::default())
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        for (id, provider) in &self.providers {
            // Validate base URL
            if !provider.base_url.starts_with("http") {
                anyhow::bail!("Invalid base URL for provider '{}': {}", id, provider.base_url);
            }

            if provider.model.trim().is_empty() {
                anyhow::bail!("Provider '{}' must have a model name", id);
            }

            if id.uses_token_exchange() {
                match &provider.token_url {
                    Some(url) if url.starts_with("http") => {}
                    Some(url) => anyhow::bail!("Invalid token URL for provider '{}': {}", id, url),
                    None => anyhow::bail!("Provider '{}' requires a tokenUrl", id),
                }
            }
        }

        Ok(())
    }

    /// Endpoint configuration for a provider, falling back to the built-in one
    pub fn provider(&self, provider: ProviderId) -> ProviderConfig {
        self.providers
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| ProviderConfig::default_for(provider))
    }

    /// Point every provider at one base URL (token endpoint under `/oauth/2.0/token`)
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let providers = ProviderId::ALL
            .iter()
            .map(|id| {
                let mut config = ProviderConfig::default_for(*id);
                config.base_url = format!("{}/{}", base, id);
                if id.uses_token_exchange() {
                    config.token_url = Some(format!("{}/oauth/2.0/token", base));
                }
                (*id, config)
            })
            .collect();

        Self {
            server: ServerConfig::default(),
            providers,
        }
    }
}
