//! In-memory transcript and the fragment reducer.
//!
//! The transcript is append-only. The one exception is the open stream
//! message, whose content grows in place until the stream is closed.

use uuid::Uuid;

use atlas_core::{ChatMessage, ChatRole, HistoryEntry};

/// Fold one decoded fragment into the prior message content.
pub fn append_fragment(prior: &str, fragment: &str) -> String {
    let mut next = String::with_capacity(prior.len() + fragment.len());
    next.push_str(prior);
    next.push_str(fragment);
    next
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    streaming: Option<Uuid>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| m.id == id)
    }

    pub fn push(&mut self, message: ChatMessage) -> &ChatMessage {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// Append an empty assistant message and make it the growth target.
    ///
    /// Any previously open stream is closed first.
    pub fn open_stream(&mut self) -> Uuid {
        self.close_stream();
        let message = ChatMessage::assistant(String::new());
        let id = message.id;
        self.messages.push(message);
        self.streaming = Some(id);
        id
    }

    /// Grow the open stream message. Returns `None` if `id` is not open.
    pub fn append_to_stream(&mut self, id: Uuid, fragment: &str) -> Option<&ChatMessage> {
        if self.streaming != Some(id) {
            return None;
        }
        let message = self.messages.iter_mut().rev().find(|m| m.id == id)?;
        message.content = append_fragment(&message.content, fragment);
        Some(message)
    }

    /// Freeze the open stream message, if any.
    pub fn close_stream(&mut self) -> Option<Uuid> {
        self.streaming.take()
    }

    pub fn streaming_id(&self) -> Option<Uuid> {
        self.streaming
    }

    /// The last `window` messages, oldest first, in wire form.
    pub fn history(&self, window: usize) -> Vec<HistoryEntry> {
        let start = self.messages.len().saturating_sub(window);
        self.messages[start..]
            .iter()
            .map(ChatMessage::to_history)
            .collect()
    }

    pub fn assistant_mentions(&self, needle: &str) -> bool {
        self.messages
            .iter()
            .any(|m| m.role == ChatRole::Assistant && m.content.contains(needle))
    }
}
