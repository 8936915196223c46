//! Chat session: one consumer's transcript, focus and stream lifecycle.
//!
//! A turn moves `Awaiting -> Streaming -> Completed`, or ends in `Failed`.
//! Observers follow along through [`SessionEvent`]s; the session never
//! renders anything itself.

use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use atlas_core::{ChatMessage, ChatRequest, PropertyFocus};

use crate::accumulator::Transcript;
use crate::decoder::Utf8ChunkDecoder;
use crate::error::ClientError;
use crate::state::{FailureReason, StreamState};
use crate::transport::{ByteStream, ChatTransport};

pub const DEFAULT_HISTORY_WINDOW: usize = 6;

/// Assistant reply when a turn fails before any text arrives.
pub const FALLBACK_APOLOGY: &str =
    "I'm having trouble reaching the AI services right now. Please try again shortly.";

/// Assistant notice appended after a partially streamed reply.
pub const INTERRUPTION_NOTICE: &str = "The response was cut off before it finished, \
so the answer above may be incomplete. Please try again.";

const EVENT_CAPACITY: usize = 1024;

pub fn focus_announcement(focus: &PropertyFocus) -> String {
    format!(
        "Now focusing on {} at {}. Ask me anything about price, comps, neighborhood vibe, \
school ratings, or schedule a tour.",
        focus.title, focus.address
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    MessageAppended(ChatMessage),
    /// The open stream message grew by `fragment`.
    MessageGrew {
        id: Uuid,
        fragment: String,
        content_len: usize,
    },
    StateChanged(StreamState),
}

/// Cancels whatever turn its session is running.
///
/// A cancel with no turn in flight is discarded when the next turn starts.
#[derive(Clone, Default)]
pub struct CancelHandle {
    token: Arc<Mutex<CancellationToken>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    /// Token for a new turn, replacing a stale cancelled one.
    fn arm(&self) -> CancellationToken {
        let mut token = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
        token.clone()
    }
}

pub struct ChatSession<T> {
    transport: T,
    transcript: Transcript,
    focus: Option<PropertyFocus>,
    state: StreamState,
    history_window: usize,
    events: broadcast::Sender<SessionEvent>,
    cancel: CancelHandle,
}

impl<T: ChatTransport> ChatSession<T> {
    pub fn new(transport: T) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            transport,
            transcript: Transcript::new(),
            focus: None,
            state: StreamState::Idle,
            history_window: DEFAULT_HISTORY_WINDOW,
            events,
            cancel: CancelHandle::default(),
        }
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.transcript.messages()
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn focus(&self) -> Option<&PropertyFocus> {
        self.focus.as_ref()
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Change the property focus.
    ///
    /// Appends an announcement unless an assistant message already names the
    /// property. Returns whether one was appended.
    pub fn set_focus(&mut self, focus: Option<PropertyFocus>) -> bool {
        self.focus = focus;
        let Some(focus) = self.focus.as_ref() else {
            return false;
        };
        if self.transcript.assistant_mentions(&focus.title) {
            debug!(title = %focus.title, "Focus already announced");
            return false;
        }
        let announcement = ChatMessage::assistant(focus_announcement(focus));
        self.append(announcement);
        true
    }

    /// Close a turn whose `submit` future was dropped mid-flight.
    ///
    /// Returns whether there was one to close.
    pub fn close_abandoned_turn(&mut self) -> bool {
        if !self.state.is_in_flight() {
            return false;
        }
        warn!(state = ?self.state, "Previous turn was abandoned; closing it as cancelled");
        self.fail(FailureReason::Cancelled);
        true
    }

    /// Send `input` and stream the reply into the transcript.
    ///
    /// On success returns the id of the assistant message. Every failure
    /// other than [`ClientError::EmptyInput`] has already been recorded in
    /// the transcript and state when it is returned.
    pub async fn submit(&mut self, input: &str) -> Result<Uuid, ClientError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(ClientError::EmptyInput);
        }
        self.close_abandoned_turn();
        let cancel = self.cancel.arm();

        let history = self.transcript.history(self.history_window);
        self.append(ChatMessage::user(text));
        self.set_state(StreamState::Awaiting);

        let request = ChatRequest {
            message: text.to_string(),
            history,
            property: self.focus.clone(),
        };
        info!(
            history_len = request.history.len(),
            has_property = request.property.is_some(),
            "Submitting chat turn"
        );

        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.transport.send(&request) => Some(result),
        };

        let response = match sent {
            None => return Err(self.fail(FailureReason::Cancelled)),
            Some(Err(err)) => {
                let detail = match err {
                    ClientError::Transport(detail) => detail,
                    other => other.to_string(),
                };
                warn!(error = %detail, "Chat request failed");
                return Err(self.fail_with_apology(FailureReason::Transport(detail)));
            }
            Some(Ok(response)) => response,
        };

        if !response.is_success() {
            warn!(status = response.status, "Chat service rejected the turn");
            return Err(self.fail_with_apology(FailureReason::Status(response.status)));
        }
        let Some(body) = response.body else {
            warn!("Chat response had no body");
            return Err(self.fail_with_apology(FailureReason::StreamUnavailable));
        };

        let id = self.transcript.open_stream();
        if let Some(message) = self.transcript.get(id).cloned() {
            self.emit(SessionEvent::MessageAppended(message));
        }
        self.set_state(StreamState::Streaming);

        self.read_body(id, body, cancel).await
    }

    async fn read_body(
        &mut self,
        id: Uuid,
        mut body: ByteStream,
        cancel: CancellationToken,
    ) -> Result<Uuid, ClientError> {
        let mut decoder = Utf8ChunkDecoder::new();
        let mut chunks = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                chunk = body.next() => Some(chunk),
            };

            match next {
                None => {
                    info!(chunks, "Turn cancelled while streaming");
                    return Err(self.fail(FailureReason::Cancelled));
                }
                Some(Some(Ok(bytes))) => {
                    chunks += 1;
                    let text = decoder.decode(&bytes);
                    self.grow(id, text);
                }
                Some(Some(Err(err))) => {
                    let detail = match err {
                        ClientError::StreamInterrupted(detail) => detail,
                        other => other.to_string(),
                    };
                    warn!(chunks, error = %detail, "Stream interrupted");
                    let tail = decoder.finish();
                    self.grow(id, tail);
                    self.transcript.close_stream();
                    self.append(ChatMessage::assistant(INTERRUPTION_NOTICE));
                    return Err(self.fail(FailureReason::StreamInterrupted(detail)));
                }
                Some(None) => {
                    let tail = decoder.finish();
                    self.grow(id, tail);
                    self.transcript.close_stream();
                    self.set_state(StreamState::Completed);
                    info!(chunks, "Turn completed");
                    return Ok(id);
                }
            }
        }
    }

    fn grow(&mut self, id: Uuid, fragment: String) {
        if fragment.is_empty() {
            return;
        }
        let Some(content_len) = self
            .transcript
            .append_to_stream(id, &fragment)
            .map(|message| message.content.len())
        else {
            return;
        };
        self.emit(SessionEvent::MessageGrew {
            id,
            fragment,
            content_len,
        });
    }

    fn fail_with_apology(&mut self, reason: FailureReason) -> ClientError {
        self.transcript.close_stream();
        self.append(ChatMessage::assistant(FALLBACK_APOLOGY));
        self.fail(reason)
    }

    fn fail(&mut self, reason: FailureReason) -> ClientError {
        self.transcript.close_stream();
        self.set_state(StreamState::Failed(reason.clone()));
        reason.into_error()
    }

    fn append(&mut self, message: ChatMessage) {
        self.transcript.push(message.clone());
        self.emit(SessionEvent::MessageAppended(message));
    }

    fn set_state(&mut self, state: StreamState) {
        self.state = state.clone();
        self.emit(SessionEvent::StateChanged(state));
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }
}
