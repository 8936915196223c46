//! Main HTTP server and routing.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use atlas_core::{catalog, LlmProvider, Property};

use crate::{chat, health_api, properties};

/// Application state shared across routes.
///
/// Immutable after startup; requests share nothing mutable.
#[derive(Clone)]
pub struct GatewayState {
    inner: Arc<StateInner>,
}

struct StateInner {
    provider: Arc<dyn LlmProvider>,
    model: String,
    properties: Vec<Property>,
    started_at: Instant,
}

impl GatewayState {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self::with_properties(provider, model, catalog())
    }

    pub fn with_properties(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        properties: Vec<Property>,
    ) -> Self {
        Self {
            inner: Arc::new(StateInner {
                provider,
                model: model.into(),
                properties,
                started_at: Instant::now(),
            }),
        }
    }

    pub fn provider(&self) -> Arc<dyn LlmProvider> {
        Arc::clone(&self.inner.provider)
    }

    pub fn model(&self) -> &str {
        &self.inner.model
    }

    pub fn properties(&self) -> &[Property] {
        &self.inner.properties
    }

    pub fn uptime(&self) -> Duration {
        self.inner.started_at.elapsed()
    }
}

/// Build the router with all API routes.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/api/health", get(health_api::get_health))
        .route("/api/chat", post(chat::chat))
        .route("/api/properties", get(properties::list_properties))
        .route("/api/properties/:id", get(properties::get_property))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until `shutdown` resolves.
#[instrument(skip(state, shutdown))]
pub async fn start_server(
    addr: &str,
    state: GatewayState,
    cors_permissive: bool,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let mut app = build_router(state);
    if cors_permissive {
        app = app.layer(CorsLayer::permissive());
    }

    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Chat gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Chat gateway stopped");
    Ok(())
}
