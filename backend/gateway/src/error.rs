//! Mapping of pipeline errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use atlas_core::AtlasError;
use atlas_logging::redact_sensitive_data;

/// An [`AtlasError`] rendered as a JSON `{ "error": ... }` response.
#[derive(Debug)]
pub struct ApiError(pub AtlasError);

impl From<AtlasError> for ApiError {
    fn from(err: AtlasError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            AtlasError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Provider details stay in the logs.
    fn public_message(&self) -> String {
        match &self.0 {
            AtlasError::InvalidRequest(msg) | AtlasError::Misconfigured(msg) => msg.clone(),
            AtlasError::ProviderFailure { .. }
            | AtlasError::StreamInterrupted(_)
            | AtlasError::StreamUnavailable => "Unable to generate response".to_string(),
            AtlasError::Config(_) | AtlasError::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = redact_sensitive_data(&self.0.to_string());
        if status.is_server_error() {
            error!(kind = self.0.kind(), error = %detail, "Chat request failed");
        } else {
            warn!(kind = self.0.kind(), error = %detail, "Chat request rejected");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
