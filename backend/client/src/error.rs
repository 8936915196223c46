//! Client error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Message is empty")]
    EmptyInput,

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Chat service returned status {0}")]
    Status(u16),

    #[error("Response carried no readable body")]
    StreamUnavailable,

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Turn cancelled")]
    Cancelled,
}
