//! Read-only property catalog endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use atlas_core::Property;

use crate::server::GatewayState;

/// Handler for `GET /api/properties`
pub async fn list_properties(State(state): State<GatewayState>) -> Json<Vec<Property>> {
    Json(state.properties().to_vec())
}

/// Handler for `GET /api/properties/:id`
pub async fn get_property(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.properties().iter().find(|p| p.id == id) {
        Some(property) => Json(property.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Unknown property: {id}") })),
        )
            .into_response(),
    }
}
