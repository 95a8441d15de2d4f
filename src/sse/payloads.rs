//! Wire payloads of the `data: ` lines.
//!
//! Fields are optional where the backend is known to omit or null them; the
//! per-type parsers decide what a missing field means.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StartPayload {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenPayload {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_final: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NodeUpdatePayload {
    #[serde(default)]
    pub node_name: Option<String>,
    #[serde(default)]
    pub content: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SourcesPayload {
    #[serde(default)]
    pub sources: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AnswerPayload {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<serde_json::Value>>,
}

/// `complete` and `message` both carry one optional text field.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TextPayload {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Read field by field rather than deserialized: the backend sends strings,
/// objects or nothing at all here.
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorPayload {
    pub message: Option<serde_json::Value>,
    pub error: Option<serde_json::Value>,
}

impl ErrorPayload {
    pub fn from_value(mut data: serde_json::Value) -> Self {
        match data.as_object_mut() {
            Some(fields) => Self {
                message: fields.remove("message"),
                error: fields.remove("error"),
            },
            None => Self::default(),
        }
    }
}
