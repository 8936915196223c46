//! Streaming LLM providers for the Atlas chat proxy.

pub mod mock;
pub mod openai;
pub mod sse;

pub use mock::MockProvider;
pub use openai::OpenAiProvider;
pub use sse::{SseDecoder, SseEvent};
