//! Upstream provider wire formats
//!
//! Request bodies sent to the providers and the error/token bodies they answer with

use super::chat::ChatMessage;
use serde::{Deserialize, Serialize};

/// OpenAI-compatible chat completion request (Doubao, DeepSeek)
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    /// Upstream model name
    pub model: &'a str,
    /// Conversation history
    pub messages: &'a [ChatMessage],
    /// Always true, the proxy only streams
    pub stream: bool,
}

/// Wenxin chat request; the model is selected by the endpoint path
#[derive(Debug, Clone, Serialize)]
pub struct WenxinChatRequest<'a> {
    pub messages: &'a [ChatMessage],
    pub stream: bool,
}

/// OAuth token endpoint response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// OpenAI-style error body
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIErrorResponse {
    pub error: OpenAIErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIErrorDetail {
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}

/// Wenxin error body, returned with HTTP 200 and a JSON content type
#[derive(Debug, Clone, Deserialize)]
pub struct WenxinErrorResponse {
    pub error_code: i64,
    #[serde(default)]
    pub error_msg: String,
}

/// Pull a human readable message out of an upstream error body
pub fn upstream_error_message(body: &str) -> String {
    if let Ok(err) = serde_json::from_str::<OpenAIErrorResponse>(body) {
        return err.error.message;
    }
    if let Ok(err) = serde_json::from_str::<WenxinErrorResponse>(body) {
        return format!("{} (error_code {})", err.error_msg, err.error_code);
    }
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_completion_request_shape() {
        let messages = vec![ChatMessage::user("hi")];
        let request = ChatCompletionRequest {
            model: "deepseek-chat",
            messages: &messages,
            stream: true,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "deepseek-chat",
                "messages": [{"role": "user", "content": "hi"}],
                "stream": true
            })
        );
    }

    #[test]
    fn test_wenxin_request_has_no_model() {
        let messages = vec![ChatMessage::user("hi")];
        let json = serde_json::to_value(WenxinChatRequest { messages: &messages, stream: true }).unwrap();
        assert!(json.get("model").is_none());
        assert_eq!(json["stream"], true);
    }

    #[test]
    fn test_upstream_error_message() {
        let openai = r#"{"error": {"message": "Invalid API key", "type": "auth"}}"#;
        assert_eq!(upstream_error_message(openai), "Invalid API key");

        let wenxin = r#"{"error_code": 110, "error_msg": "Access token invalid or no longer valid"}"#;
        assert_eq!(
            upstream_error_message(wenxin),
            "Access token invalid or no longer valid (error_code 110)"
        );

        assert_eq!(upstream_error_message(" bad gateway \n"), "bad gateway");
    }
}
