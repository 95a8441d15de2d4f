use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timeline::Timeline;
use super::{deserialize_id, deserialize_nullable_string};

/// Id prefix of a conversation that only exists locally.
pub const DRAFT_PREFIX: &str = "temp_";

/// Title used when the backend has none.
pub const DEFAULT_TITLE: &str = "New conversation";

/// Number of characters of the first message kept in a derived title.
const TITLE_CHARS: usize = 20;

/// Title derived from the first user message: the first 20 characters, with
/// an ellipsis when the message is longer.
pub fn derive_title(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(TITLE_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Parse a backend timestamp. Accepts RFC 3339 and naive ISO-8601 (taken as
/// UTC); anything else yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// A conversation as the backend lists or creates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub conversation_id: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub title: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A conversation in the local collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// False while the conversation only exists locally.
    pub persisted: bool,
    #[serde(rename = "messages")]
    pub timeline: Timeline,
}

impl Conversation {
    /// A fresh local-only conversation with a `temp_` id.
    pub fn draft() -> Self {
        let now = Utc::now();
        Self {
            id: format!("{DRAFT_PREFIX}{}", Uuid::new_v4()),
            title: DEFAULT_TITLE.to_string(),
            created_at: now,
            updated_at: now,
            persisted: false,
            timeline: Timeline::new(),
        }
    }

    pub fn from_record(record: ConversationRecord) -> Self {
        let now = Utc::now();
        let created_at = record
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(now);
        let updated_at = record
            .updated_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(created_at);
        let title = if record.title.trim().is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            record.title
        };
        Self {
            id: record.conversation_id,
            title,
            created_at,
            updated_at,
            persisted: true,
            timeline: Timeline::new(),
        }
    }

    pub fn is_draft(&self) -> bool {
        !self.persisted
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn toggle_expanded(&mut self, message_id: &str) -> bool {
        self.timeline.toggle_expanded(message_id)
    }
}
