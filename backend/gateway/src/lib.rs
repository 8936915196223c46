//! Atlas chat gateway.
//!
//! Serves the streaming chat proxy and the read-only property catalog.

pub mod chat;
pub mod error;
pub mod health_api;
pub mod prompt;
pub mod properties;
pub mod relay;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, start_server, GatewayState};
