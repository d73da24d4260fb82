mod api;
mod config;
mod handlers;
mod models;
mod services;

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;

use api::server::{create_api_router, RouterOptions};
use config::Config;
use handlers::NutritionAdvisor;
use services::{CredentialResolver, DashScopeClient, PromptBuilder};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before the logger reads RUST_LOG
    dotenv().ok();

    // Initialize logger
    env_logger::init();

    log::info!("🚀 Starting Nutri-X server...");

    let config = Config::from_env()?;

    let credentials = CredentialResolver::new(config.api_key.clone());
    if !credentials.has_fallback() {
        log::warn!(
            "⚠️ {} not set, every request must send its own key in the x-api-key header",
            config::API_KEY_VAR
        );
    }

    let model = Arc::new(DashScopeClient::new(config.dashscope.clone())?);
    log::info!(
        "✅ DashScope client initialized (vision: {}, text: {}, timeout: {:?})",
        config.dashscope.vision_model,
        config.dashscope.text_model,
        config.dashscope.timeout
    );

    let advisor = Arc::new(
        NutritionAdvisor::new(
            model,
            credentials,
            PromptBuilder::new(config.response_language.clone()),
        )
        .assume_food_when_unflagged(config.assume_food_when_unflagged)
        .keep_report_code_blocks(config.keep_report_code_blocks),
    );

    let app = create_api_router(
        advisor,
        RouterOptions {
            static_dir: config.static_dir.clone(),
            max_upload_bytes: config.max_upload_bytes,
        },
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    log::info!("🌐 Server listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("🛑 Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("❌ Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
