//! HTTP handlers module
//!
//! Contains all HTTP endpoint handling logic

pub mod chat;
pub mod health;

use crate::config::{AppConfig, Settings};
use crate::middleware::{payload_limit_middleware, request_logging_middleware};
use crate::services::Dispatcher;
use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName,
    },
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Application state
pub struct AppState {
    pub settings: Settings,
    pub config: AppConfig,
    pub dispatcher: Dispatcher,
    pub started_at: Instant,
}

/// Create application router
pub fn create_router(settings: Settings, config: AppConfig) -> Result<Router> {
    let dispatcher = Dispatcher::new(settings.clone(), &config)?;
    Ok(router_with_dispatcher(settings, config, dispatcher))
}

/// Create application router around an existing dispatcher
pub fn router_with_dispatcher(settings: Settings, config: AppConfig, dispatcher: Dispatcher) -> Router {
    let max_request_size = settings.request.max_request_size;

    let app_state = Arc::new(AppState {
        settings,
        config,
        dispatcher,
        started_at: Instant::now(),
    });

    // Answered for every origin, including pre-flight requests
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            CONTENT_TYPE,
        ]);

    // Create middleware stack
    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(middleware::from_fn_with_state(max_request_size, payload_limit_middleware))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_request_size));

    Router::new()
        .route("/chat-with-models", post(chat::handle_chat))
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .route("/health/ready", get(health::readiness_check))
        .with_state(app_state)
        .layer(middleware_stack)
}
