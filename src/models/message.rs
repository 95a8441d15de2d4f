use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Appended to a streaming message when the caller cancels the exchange.
pub const CANCELLED_MARKER: &str = "[Cancelled]";

/// Who produced a timeline entry.
///
/// Unknown roles coming back from history are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    /// Progress notification from a backend processing stage.
    NodeUpdate,
    Other(String),
}

impl MessageRole {
    pub fn as_str(&self) -> &str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
            MessageRole::NodeUpdate => "node_update",
            MessageRole::Other(role) => role,
        }
    }
}

impl From<String> for MessageRole {
    fn from(role: String) -> Self {
        match role.as_str() {
            "user" => MessageRole::User,
            "assistant" => MessageRole::Assistant,
            "system" => MessageRole::System,
            "node_update" => MessageRole::NodeUpdate,
            _ => MessageRole::Other(role),
        }
    }
}

impl From<&str> for MessageRole {
    fn from(role: &str) -> Self {
        MessageRole::from(role.to_string())
    }
}

impl From<MessageRole> for String {
    fn from(role: MessageRole) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a conversation timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Stable for the lifetime of the message.
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Citation records attached to an assistant reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<serde_json::Value>>,
    /// Set only for `node_update` entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(default)]
    pub is_streaming: bool,
    /// UI fold state; node updates start collapsed.
    #[serde(default)]
    pub expanded: bool,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            sources: None,
            node_name: None,
            is_streaming: false,
            expanded: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// The in-flight assistant reply, created on the first token.
    pub fn streaming_assistant(first_token: impl Into<String>) -> Self {
        Self {
            is_streaming: true,
            ..Self::new(MessageRole::Assistant, first_token)
        }
    }

    pub fn node_update(node_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            node_name: Some(node_name.into()),
            ..Self::new(MessageRole::NodeUpdate, content)
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }

    pub fn append_token(&mut self, token: &str) {
        self.content.push_str(token);
    }

    /// Freeze the message with its complete text.
    pub fn finalize(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.is_streaming = false;
    }

    /// Freeze a cancelled reply, keeping what already arrived.
    pub fn cancel(&mut self) {
        if self.content.is_empty() {
            self.content = CANCELLED_MARKER.to_string();
        } else {
            self.content.push_str("\n\n");
            self.content.push_str(CANCELLED_MARKER);
        }
        self.is_streaming = false;
    }
}
