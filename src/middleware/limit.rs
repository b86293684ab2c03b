//! Request size middleware
//!
//! The body limit layer and axum's body extractor both answer an oversized
//! request with a plain-text 413. This rewrites those into the JSON error body
//! every other failure uses.

use crate::utils::error::AppError;
use axum::{
    extract::{Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Rewrite a non-JSON 413 into `{ "error": ... }`
pub async fn payload_limit_middleware(State(limit): State<usize>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    if response.status() == StatusCode::PAYLOAD_TOO_LARGE && !is_json(&response) {
        return AppError::PayloadTooLarge(limit).into_response();
    }

    response
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false)
}
