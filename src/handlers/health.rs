//! Health check handlers
//!
//! Provides application health status check endpoints

use crate::handlers::AppState;
use crate::models::ProviderId;
use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

const SERVICE_NAME: &str = "modelcompare";

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service name
    pub service: String,
    /// Version information
    pub version: String,
    /// Timestamp
    pub timestamp: String,
    /// Details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

/// Check result
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthDetails {
    /// Upstream model per provider
    pub models: BTreeMap<String, String>,
    /// Secrets that still need to be configured
    pub missing_secrets: Vec<String>,
    /// Uptime in seconds
    pub uptime_seconds: u64,
}

fn response(status: &str, state: &AppState) -> HealthResponse {
    HealthResponse {
        status: status.to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        details: Some(HealthDetails {
            models: ProviderId::ALL
                .iter()
                .map(|id| (id.to_string(), state.config.provider(*id).model))
                .collect(),
            missing_secrets: state
                .settings
                .missing_credentials()
                .into_iter()
                .map(str::to_string)
                .collect(),
            uptime_seconds: state.started_at.elapsed().as_secs(),
        }),
    }
}

/// Basic health check
///
/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Executing health check");
    Json(response("healthy", &state))
}

/// Readiness check
///
/// GET /health/ready
/// Not ready while any provider secret is missing, since every chat call
/// would fail with a configuration error.
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    debug!("Executing readiness check");

    if state.settings.missing_credentials().is_empty() {
        Ok(Json(response("ready", &state)))
    } else {
        warn!("Readiness check failed: provider secrets missing");
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response("not_ready", &state))))
    }
}

/// Liveness check
///
/// GET /health/live
pub async fn liveness_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Executing liveness check");

    Json(HealthResponse {
        details: None,
        ..response("alive", &state)
    })
}
