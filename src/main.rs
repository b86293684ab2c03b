//! modelcompare server
//!
//! Streaming proxy that forwards a chat conversation to one of three
//! providers and relays the reply as it is generated

use anyhow::{Context, Result};
use modelcompare::utils::logging::init_logging;
use modelcompare::{create_router, version_info, AppConfig, Settings};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load settings from environment (secrets, timeouts, logging)
    let settings = Settings::new().context("Failed to load server settings")?;

    init_logging(&settings.logging)?;
    info!("{}", version_info());

    // Provider endpoints from the optional JSON file
    let app_config = AppConfig::load_default().context("Failed to load provider configuration")?;
    info!("📁 Provider configuration loaded");

    let missing = settings.missing_credentials();
    if !missing.is_empty() {
        warn!("Chat calls will fail until these are set: {}", missing.join(", "));
    }

    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let app = create_router(settings, app_config)?;

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("🚀 modelcompare server started!");
    info!("📝 Health check: http://{}/health", addr);
    info!("🔄 Chat endpoint: http://{}/chat-with-models", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start server: {}", e))?;

    Ok(())
}
