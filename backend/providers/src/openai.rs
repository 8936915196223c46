use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use atlas_core::{AtlasError, CompletionRequest, FragmentStream, LlmProvider, PromptMessage};

use crate::sse::{SseDecoder, SseEvent};

const PROVIDER_NAME: &str = "openai";

/// OpenAI-compatible chat-completions provider with streaming enabled.
pub struct OpenAiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Bound the time spent establishing the provider connection.
    ///
    /// The stream itself is not time-limited; it lives as long as the caller reads it.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client with timeout; using defaults");
                Client::new()
            });
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    temperature: f32,
    top_p: f32,
    stream: bool,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn stream_chat(&self, request: &CompletionRequest) -> Result<FragmentStream, AtlasError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AtlasError::Misconfigured("Missing OPENAI_API_KEY".to_string()))?;

        let start = Instant::now();
        let body = ChatRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            top_p: request.top_p,
            stream: true,
        };

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Opening streaming completion"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| AtlasError::provider(PROVIDER_NAME, format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(AtlasError::provider(
                PROVIDER_NAME,
                format!("{status}: {error_body}"),
            ));
        }

        debug!(
            latency_ms = start.elapsed().as_millis() as u64,
            "Provider stream opened"
        );

        Ok(decode_event_stream(response.bytes_stream().boxed()))
    }
}

struct DecodeState {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, AtlasError>>,
    finished: bool,
}

impl DecodeState {
    /// Queue decoded events. Returns true once the stream is over.
    fn absorb(&mut self, events: impl IntoIterator<Item = SseEvent>) -> bool {
        for event in events {
            match event {
                SseEvent::Fragment(text) => self.pending.push_back(Ok(text)),
                SseEvent::Done => return true,
                SseEvent::Error(message) => {
                    self.pending
                        .push_back(Err(AtlasError::StreamInterrupted(message)));
                    return true;
                }
            }
        }
        false
    }
}

/// Turn a raw SSE body into a stream of content fragments.
///
/// The body is owned by the returned stream, so dropping the stream closes
/// the provider connection.
fn decode_event_stream(body: BoxStream<'static, reqwest::Result<Bytes>>) -> FragmentStream {
    let state = DecodeState {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(&chunk);
                    state.finished = state.absorb(events);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state
                        .pending
                        .push_back(Err(AtlasError::StreamInterrupted(e.to_string())));
                }
                None => {
                    let tail = state.decoder.finish();
                    state.absorb(tail);
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}
