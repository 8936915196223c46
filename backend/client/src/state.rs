//! Per-turn stream lifecycle.

use std::fmt;

use crate::error::ClientError;

/// Why a turn ended without completing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The gateway answered with a non-success status.
    Status(u16),
    /// The request never got a response.
    Transport(String),
    /// A success status with no body to read.
    StreamUnavailable,
    /// The body failed after some text was received.
    StreamInterrupted(String),
    Cancelled,
}

impl FailureReason {
    pub fn into_error(self) -> ClientError {
        match self {
            FailureReason::Status(code) => ClientError::Status(code),
            FailureReason::Transport(msg) => ClientError::Transport(msg),
            FailureReason::StreamUnavailable => ClientError::StreamUnavailable,
            FailureReason::StreamInterrupted(msg) => ClientError::StreamInterrupted(msg),
            FailureReason::Cancelled => ClientError::Cancelled,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Status(code) => write!(f, "status {code}"),
            FailureReason::Transport(msg) => write!(f, "transport: {msg}"),
            FailureReason::StreamUnavailable => write!(f, "stream unavailable"),
            FailureReason::StreamInterrupted(msg) => write!(f, "interrupted: {msg}"),
            FailureReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Lifecycle of one request/response cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Idle,
    /// Request sent, no response yet.
    Awaiting,
    /// Response accepted, body being read.
    Streaming,
    Completed,
    Failed(FailureReason),
}

impl StreamState {
    /// Whether the session will take a new submission.
    pub fn accepts_input(&self) -> bool {
        !self.is_in_flight()
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, StreamState::Awaiting | StreamState::Streaming)
    }
}
