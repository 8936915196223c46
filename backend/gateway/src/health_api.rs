//! Health API
//!
//! Reports process liveness and whether the provider credential is present.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::server::GatewayState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub provider_configured: bool,
    pub model: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

/// Handler for `GET /api/health`
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthReport> {
    let provider = state.provider();
    Json(HealthReport {
        status: "ok",
        service: "atlas",
        version: env!("CARGO_PKG_VERSION"),
        provider: provider.name().to_string(),
        provider_configured: provider.is_configured(),
        model: state.model().to_string(),
        uptime_seconds: state.uptime().as_secs(),
        timestamp: Utc::now(),
    })
}
