//! Chat handler
//!
//! `POST /chat-with-models`: forwards one conversation to the requested
//! provider and pipes the provider's event stream back unchanged.

use crate::handlers::AppState;
use crate::models::ChatRequest;
use crate::utils::error::{AppError, AppResult};
use crate::utils::logging::create_request_log_summary;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{
        header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE},
        StatusCode,
    },
    response::Response,
};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Handle a chat request
pub async fn handle_chat(State(state): State<Arc<AppState>>, body: Bytes) -> AppResult<Response> {
    let request: ChatRequest =
        serde_json::from_slice(&body).map_err(|e| AppError::InvalidRequest(e.to_string()))?;

    info!(
        "Chat request: model={}, messages={}, conversation={}",
        request.model,
        request.messages.len(),
        request.conversation_id.as_deref().unwrap_or("-")
    );

    debug!("Request body: {}", create_request_log_summary(&request));

    let upstream = state
        .dispatcher
        .dispatch(&request.model, &request.messages)
        .await?;

    debug!("Relaying {} stream, upstream status {}", request.model, upstream.status);

    let model = request.model;
    let stream = upstream.body.inspect(move |chunk| {
        if let Err(e) = chunk {
            warn!("{} stream interrupted: {}", model, e);
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/event-stream")
        .header(CACHE_CONTROL, "no-cache")
        .header(CONNECTION, "keep-alive")
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}
