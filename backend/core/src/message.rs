use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::property::PropertyFocus;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    /// Parse a wire role. Only `user` and `assistant` are recognised.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(ChatRole::User),
            "assistant" => Some(ChatRole::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message in the client-side transcript.
///
/// `content` only grows while the message is the target of an active stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    /// Reduce to the role/content pair carried in request history.
    pub fn to_history(&self) -> HistoryEntry {
        HistoryEntry {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// One prior turn as sent to the chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: ChatRole,
    pub content: String,
}

impl HistoryEntry {
    /// Leniently read a history entry from untrusted JSON.
    ///
    /// Returns `None` unless `role` is a recognised role string and
    /// `content` is a string.
    pub fn from_value(value: &Value) -> Option<Self> {
        let role = value.get("role")?.as_str().and_then(ChatRole::parse)?;
        let content = value.get("content")?.as_str()?.to_string();
        Some(Self { role, content })
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<PropertyFocus>,
}

/// Keep only well-formed history entries, preserving their relative order.
pub fn filter_history(raw: Option<&Value>) -> Vec<HistoryEntry> {
    match raw {
        Some(Value::Array(entries)) => {
            entries.iter().filter_map(HistoryEntry::from_value).collect()
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_parse() {
        assert_eq!(ChatRole::parse("user"), Some(ChatRole::User));
        assert_eq!(ChatRole::parse("assistant"), Some(ChatRole::Assistant));
        assert_eq!(ChatRole::parse("system"), None);
        assert_eq!(ChatRole::parse("User"), None);
    }

    #[test]
    fn test_filter_history_drops_malformed_entries() {
        let raw = json!([
            { "role": "user", "content": "first" },
            { "role": 7, "content": "bad role type" },
            { "role": "assistant" },
            "not an object",
            { "role": "system", "content": "unrecognised role" },
            { "role": "assistant", "content": 42 },
            { "role": "assistant", "content": "second" },
            { "content": "no role" },
            { "role": "user", "content": "third", "extra": true }
        ]);

        let history = filter_history(Some(&raw));
        let contents: Vec<&str> = history.iter().map(|h| h.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert_eq!(history[1].role, ChatRole::Assistant);
    }

    #[test]
    fn test_filter_history_non_array_is_empty() {
        assert!(filter_history(None).is_empty());
        assert!(filter_history(Some(&json!({"role": "user"}))).is_empty());
        assert!(filter_history(Some(&Value::Null)).is_empty());
    }

    #[test]
    fn test_history_entry_wire_shape() {
        let entry = ChatMessage::assistant("hi").to_history();
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value, json!({ "role": "assistant", "content": "hi" }));
    }
}
