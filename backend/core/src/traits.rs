use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::AtlasError;

/// Stream of incremental text fragments from a provider.
///
/// Dropping the stream must release the underlying provider connection.
pub type FragmentStream = BoxStream<'static, Result<String, AtlasError>>;

/// Trait for streaming LLM providers used by the chat proxy.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "openai", "mock").
    fn name(&self) -> &str;

    /// Whether a credential is available. Checked before any network call.
    fn is_configured(&self) -> bool;

    /// Open a streaming completion.
    ///
    /// Errors returned here happen before any fragment exists; errors yielded
    /// by the stream happen mid-flight.
    async fn stream_chat(&self, request: &CompletionRequest) -> Result<FragmentStream, AtlasError>;
}

/// Role of a message inside a composed provider prompt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

/// One message of a composed provider prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::Assistant,
            content: content.into(),
        }
    }
}

/// Streaming completion request sent to a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<PromptMessage>,
    pub temperature: f32,
    pub top_p: f32,
}
