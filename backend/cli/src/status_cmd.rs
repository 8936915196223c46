//! `atlas status`: check a running gateway.

use anyhow::{Context, Result};

use crate::api::GatewayClient;
use crate::terminal_output::{note_success, note_warn};

pub async fn run(server_url: &str) -> Result<()> {
    let client = GatewayClient::new(server_url);
    let health = client
        .health()
        .await
        .with_context(|| format!("Atlas gateway is not reachable at {}", client.base_url()))?;

    note_success(&format!("Atlas gateway is up at {}", client.base_url()));
    println!("{}", serde_json::to_string_pretty(&health)?);

    if health["provider_configured"] == false {
        note_warn("Provider credential is missing; chat requests will fail");
    }
    Ok(())
}
