//! `atlas properties`: list the catalog.

use anyhow::Result;

use atlas_core::{catalog, Property};

use crate::api::GatewayClient;
use crate::terminal_output::{note_warn, render_table};

const HEADERS: [&str; 7] = ["ID", "TITLE", "STATUS", "PRICE", "BEDS", "BATHS", "SQFT"];

/// Print the gateway's catalog, or the built-in one when offline.
pub async fn run(server_url: &str, offline: bool) -> Result<()> {
    let properties = if offline {
        catalog()
    } else {
        match GatewayClient::new(server_url).properties().await {
            Ok(properties) => properties,
            Err(e) => {
                note_warn(&format!("{e:#}; showing the built-in catalog"));
                catalog()
            }
        }
    };

    print!("{}", render_table(&HEADERS, &property_rows(&properties)));
    Ok(())
}

pub fn property_rows(properties: &[Property]) -> Vec<Vec<String>> {
    properties
        .iter()
        .map(|p| {
            vec![
                p.id.clone(),
                p.title.clone(),
                p.status.to_string(),
                p.price.clone(),
                p.beds.to_string(),
                p.baths.to_string(),
                p.area.to_string(),
            ]
        })
        .collect()
}
