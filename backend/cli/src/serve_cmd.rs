//! `atlas serve`: run the chat gateway until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};

use atlas_config::AtlasConfig;
use atlas_core::LlmProvider;
use atlas_gateway::{start_server, GatewayState};
use atlas_providers::OpenAiProvider;

pub async fn run(config: &AtlasConfig) -> Result<()> {
    let provider = OpenAiProvider::new(config.provider.api_key.clone())
        .with_base_url(config.provider.base_url.clone())
        .with_connect_timeout(Duration::from_secs(config.provider.connect_timeout_secs));

    if !provider.is_configured() {
        warn!("OPENAI_API_KEY is not set; chat requests will fail until it is provided");
    }
    info!(
        addr = %config.server.addr(),
        model = %config.provider.model,
        base_url = %config.provider.base_url,
        "Starting Atlas gateway"
    );

    let state = GatewayState::new(Arc::new(provider), config.provider.model.clone());
    start_server(
        &config.server.addr(),
        state,
        config.server.cors_permissive,
        shutdown_signal(),
    )
    .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!(error = %e, "Could not listen for Ctrl-C; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
