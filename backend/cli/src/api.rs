//! HTTP client for the gateway's read-only endpoints.

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;

use atlas_core::Property;

pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /api/health`
    pub async fn health(&self) -> Result<Value> {
        self.get_json("/api/health").await
    }

    /// `GET /api/properties`
    pub async fn properties(&self) -> Result<Vec<Property>> {
        let value = self.get_json("/api/properties").await?;
        serde_json::from_value(value).context("Unexpected property list shape")
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Could not reach {url}"))?
            .error_for_status()
            .with_context(|| format!("Request to {url} failed"))?;
        response
            .json()
            .await
            .with_context(|| format!("Invalid JSON from {url}"))
    }
}
