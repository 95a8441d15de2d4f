//! Typed events of the chat stream.

use serde::{Deserialize, Serialize};

/// One application event decoded from a `data: ` line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// The backend accepted the request.
    Start {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        session_id: Option<String>,
    },
    /// Reply text. With `is_final` the content is the complete reply, not an
    /// increment.
    Token {
        content: String,
        #[serde(default)]
        is_final: bool,
    },
    /// Progress from a processing stage, shown as its own timeline entry.
    NodeUpdate { node_name: String, content: String },
    /// Citations for the reply that was just finalized.
    Sources { sources: Vec<serde_json::Value> },
    Complete {
        #[serde(default)]
        message: Option<String>,
    },
    /// Complete answer delivered in one piece.
    Answer {
        content: String,
        #[serde(default)]
        sources: Option<Vec<serde_json::Value>>,
    },
    /// Complete answer delivered in one piece, without citations.
    Message { content: String },
    /// Terminal backend failure.
    Error { message: String },
}

impl StreamEvent {
    /// Wire name of the event type.
    pub fn event_type_name(&self) -> &'static str {
        match self {
            StreamEvent::Start { .. } => "start",
            StreamEvent::Token { .. } => "token",
            StreamEvent::NodeUpdate { .. } => "node_update",
            StreamEvent::Sources { .. } => "sources",
            StreamEvent::Complete { .. } => "complete",
            StreamEvent::Answer { .. } => "answer",
            StreamEvent::Message { .. } => "message",
            StreamEvent::Error { .. } => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StreamEvent::Error { .. })
    }
}

/// Classification of one decoded line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// Empty or whitespace-only line (event separator).
    Blank,
    /// A line that carries nothing for us: not `data: `-prefixed, an unknown
    /// event type, or a token without content.
    Ignored(String),
    /// A `data: ` line whose payload could not be read.
    Malformed(EventParseError),
    Event(StreamEvent),
}

/// A single unreadable stream line. Recovered locally, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventParseError {
    InvalidJson { source: String },
    /// JSON object without a string `type` field.
    MissingType,
    /// Known type with missing or mistyped fields.
    InvalidPayload { event_type: String, source: String },
}

impl std::fmt::Display for EventParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventParseError::InvalidJson { source } => write!(f, "Invalid JSON: {}", source),
            EventParseError::MissingType => write!(f, "Payload has no type field"),
            EventParseError::InvalidPayload { event_type, source } => {
                write!(f, "Invalid payload for event '{}': {}", event_type, source)
            }
        }
    }
}

impl std::error::Error for EventParseError {}
