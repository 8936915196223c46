//! Incremental decoder for OpenAI-style chat-completion SSE streams.
//!
//! HTTP chunks can split a `data:` line (and a multi-byte UTF-8 character)
//! at any byte, so bytes are buffered until a full line is available.

use serde::Deserialize;
use tracing::{debug, warn};

/// Decoded item from the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Non-empty `choices[0].delta.content`.
    Fragment(String),
    /// `data: [DONE]`
    Done,
    /// The provider reported an error inside the stream.
    Error(String),
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamError {
    #[serde(default)]
    message: Option<String>,
}

/// Line-buffering SSE decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes, returning every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(idx) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=idx).collect();
            if let Some(event) = parse_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        parse_line(&String::from_utf8_lossy(&line))
    }
}

fn parse_line(line: &str) -> Option<SseEvent> {
    let line = line.trim();
    // Blank separators, comments, and `event:`/`id:`/`retry:` fields carry no content.
    let data = line.strip_prefix("data:")?.trim_start();

    if data == "[DONE]" {
        debug!("Received [DONE] signal");
        return Some(SseEvent::Done);
    }

    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => {
            if let Some(error) = chunk.error {
                return Some(SseEvent::Error(
                    error.message.unwrap_or_else(|| "unknown provider error".to_string()),
                ));
            }
            chunk
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta)
                .and_then(|d| d.content)
                .filter(|content| !content.is_empty())
                .map(SseEvent::Fragment)
        }
        Err(e) => {
            warn!(error = %e, "Skipping unparseable SSE data line");
            None
        }
    }
}
