//! Provider identifiers and credentials

use crate::utils::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of upstream providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Volcengine Ark (Doubao), bearer key
    Doubao,
    /// DeepSeek, bearer key
    DeepSeek,
    /// Baidu Wenxin (ERNIE), key pair exchanged for an access token
    Wenxin,
}

impl ProviderId {
    /// All providers in pane order
    pub const ALL: [ProviderId; 3] = [ProviderId::Doubao, ProviderId::DeepSeek, ProviderId::Wenxin];

    /// Wire id used in requests and configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Doubao => "doubao",
            ProviderId::DeepSeek => "deepseek",
            ProviderId::Wenxin => "wenxin",
        }
    }

    /// Position of the provider's pane
    pub fn index(&self) -> usize {
        match self {
            ProviderId::Doubao => 0,
            ProviderId::DeepSeek => 1,
            ProviderId::Wenxin => 2,
        }
    }

    /// Whether the provider needs a key pair exchanged for a token
    pub fn uses_token_exchange(&self) -> bool {
        matches!(self, ProviderId::Wenxin)
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "doubao" => Ok(ProviderId::Doubao),
            "deepseek" => Ok(ProviderId::DeepSeek),
            "wenxin" => Ok(ProviderId::Wenxin),
            other => Err(AppError::InvalidProvider(other.to_string())),
        }
    }
}

/// Secret material handed to an adapter for one call
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Static key sent as `Authorization: Bearer`
    Bearer(String),
    /// Long-lived key pair exchanged for a short-lived access token
    KeyPair { api_key: String, secret_key: String },
}

// Secrets stay out of logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Bearer(_) => f.write_str("Bearer(***)"),
            Credential::KeyPair { .. } => f.write_str("KeyPair(***)"),
        }
    }
}
