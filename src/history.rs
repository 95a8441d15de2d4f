//! History loading: backend response shapes to the in-memory message shape.
//!
//! Everything that inspects how the backend wraps its answers lives here.
//! The rest of the crate only sees the canonical inner value.

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::models::{
    deserialize_optional_id, parse_timestamp, Message, MessageRole,
};

/// `status` value of a successful response envelope.
const ENVELOPE_OK: i64 = 200;

/// Record `type` of a node progress entry.
const KIND_UPDATES: &str = "updates";
/// Record `type` of a user or assistant message.
const KIND_MESSAGES: &str = "messages";

/// Why a backend answer does not carry a usable payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadError {
    /// Envelope status, if the failure came from one.
    pub status: Option<u16>,
    pub message: String,
}

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (status {})", self.message, status),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for PayloadError {}

fn failure_message(value: &serde_json::Value, fallback: &str) -> String {
    ["msg", "message", "detail", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .filter(|m| !m.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Reduce any backend answer to its canonical inner value.
///
/// Handles, outermost first:
/// - the `{status, data, msg}` envelope, where `status != 200` is a failure
/// - a `{success, ...}` service result, where `success == false` is a failure
/// - list wrappers `{success, conversations: [...]}` and `{success, history: [...]}`
///
/// A body matching none of these is returned unchanged.
pub fn normalize_payload(body: serde_json::Value) -> Result<serde_json::Value, PayloadError> {
    let mut inner = body;

    let envelope_status = inner
        .as_object()
        .filter(|obj| obj.contains_key("data") || obj.contains_key("msg"))
        .and_then(|obj| obj.get("status"))
        .and_then(|s| s.as_i64());
    if let Some(status) = envelope_status {
        if status != ENVELOPE_OK {
            return Err(PayloadError {
                status: u16::try_from(status).ok(),
                message: failure_message(&inner, "request failed"),
            });
        }
        inner = inner
            .get_mut("data")
            .map(serde_json::Value::take)
            .unwrap_or(serde_json::Value::Null);
    }

    if inner.get("success").and_then(|s| s.as_bool()) == Some(false) {
        return Err(PayloadError {
            status: None,
            message: failure_message(&inner, "request failed"),
        });
    }

    for key in ["history", "conversations"] {
        if inner.get(key).map_or(false, |v| v.is_array()) {
            return Ok(inner
                .get_mut(key)
                .map(serde_json::Value::take)
                .unwrap_or_default());
        }
    }

    Ok(inner)
}

/// One stored timeline entry as the backend returns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// `updates` or `messages`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub content: Option<serde_json::Value>,
    #[serde(default)]
    pub node_name: Option<String>,
    #[serde(default)]
    pub extra_data: Option<serde_json::Value>,
    #[serde(default, alias = "created_at")]
    pub timestamp: Option<String>,
}

impl HistoryRecord {
    fn content_text(&self) -> String {
        match &self.content {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    fn extra(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra_data.as_ref().and_then(|extra| extra.get(key))
    }

    /// Node name from the record, or from `extra_data` where the backend
    /// stores it.
    fn node_name(&self) -> Option<String> {
        self.node_name.clone().or_else(|| {
            self.extra("node_name")
                .and_then(|n| n.as_str())
                .map(str::to_owned)
        })
    }

    /// Translate into the in-memory message shape.
    pub fn into_message(self) -> Message {
        let role = self.role.clone().unwrap_or_default();
        let mut message = Message::new(MessageRole::from(role.as_str()), self.content_text());
        message.id = self.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        if let Some(ts) = self.timestamp.as_deref().and_then(parse_timestamp) {
            message.timestamp = ts;
        }

        match self.kind.as_deref() {
            Some(KIND_UPDATES) if role == "system" => {
                message.role = MessageRole::NodeUpdate;
                message.node_name = self.node_name();
                message.expanded = false;
            }
            Some(KIND_MESSAGES) if message.is_assistant() => {
                message.sources = self
                    .extra("sources")
                    .and_then(|s| s.as_array())
                    .cloned();
            }
            _ => {}
        }
        message
    }
}

/// Read records from a normalized payload. A non-array payload yields no
/// records; unreadable entries are skipped.
pub fn parse_records(payload: serde_json::Value) -> Vec<HistoryRecord> {
    let serde_json::Value::Array(items) = payload else {
        if !payload.is_null() {
            warn!("History payload is not a list, treating as empty");
        }
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<HistoryRecord>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable history record");
                None
            }
        })
        .collect()
}

/// Translate records into a timeline, preserving order.
pub fn records_to_messages(records: Vec<HistoryRecord>) -> Vec<Message> {
    records.into_iter().map(HistoryRecord::into_message).collect()
}
