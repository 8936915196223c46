use thiserror::Error;

/// Top-level error type for the Atlas chat pipeline.
#[derive(Debug, Error)]
pub enum AtlasError {
    /// The chat request was missing a usable `message`.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The provider credential is absent.
    #[error("misconfigured: {0}")]
    Misconfigured(String),

    /// The provider call failed before any fragment was relayed.
    #[error("LLM provider error ({provider}): {message}")]
    ProviderFailure { provider: String, message: String },

    /// The provider stream failed after relaying had started.
    #[error("stream interrupted: {0}")]
    StreamInterrupted(String),

    /// A success response arrived without a readable body.
    #[error("response stream unavailable")]
    StreamUnavailable,

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AtlasError {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderFailure {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Stable snake_case tag used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AtlasError::InvalidRequest(_) => "invalid_request",
            AtlasError::Misconfigured(_) => "misconfigured",
            AtlasError::ProviderFailure { .. } => "provider_failure",
            AtlasError::StreamInterrupted(_) => "stream_interrupted",
            AtlasError::StreamUnavailable => "stream_unavailable",
            AtlasError::Config(_) => "config",
            AtlasError::Other(_) => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_failure_display() {
        let err = AtlasError::provider("openai", "502 Bad Gateway");
        assert_eq!(
            err.to_string(),
            "LLM provider error (openai): 502 Bad Gateway"
        );
        assert_eq!(err.kind(), "provider_failure");
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: AtlasError = anyhow::anyhow!("boom").into();
        assert_eq!(err.kind(), "other");
        assert_eq!(err.to_string(), "boom");
    }
}
