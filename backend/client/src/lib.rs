//! Atlas chat client.
//!
//! Sends chat turns to the gateway and accumulates the streamed reply into a
//! single growing assistant message.

pub mod accumulator;
pub mod decoder;
pub mod error;
pub mod session;
pub mod state;
pub mod transport;

pub use accumulator::{append_fragment, Transcript};
pub use decoder::Utf8ChunkDecoder;
pub use error::ClientError;
pub use session::{
    focus_announcement, CancelHandle, ChatSession, SessionEvent, DEFAULT_HISTORY_WINDOW,
    FALLBACK_APOLOGY, INTERRUPTION_NOTICE,
};
pub use state::{FailureReason, StreamState};
pub use transport::{ByteStream, ChatTransport, HttpTransport, TransportResponse};
