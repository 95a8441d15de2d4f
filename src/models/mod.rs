mod conversation;
mod message;
mod request;
mod timeline;

pub use conversation::{
    derive_title, parse_timestamp, Conversation, ConversationRecord, DEFAULT_TITLE, DRAFT_PREFIX,
};
pub use message::{Message, MessageRole, CANCELLED_MARKER};
pub use request::{ChatReply, ChatRequest, SendOptions, DEFAULT_REPLY, MAX_CONTENT_CHARS};
pub use timeline::Timeline;

use serde::{Deserialize, Deserializer};

/// Helper to deserialize id as either string or integer
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Signed(n) => n.to_string(),
        RawId::Unsigned(n) => n.to_string(),
    })
}

/// Helper to deserialize an optional id given as string, integer or null
pub(crate) fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapped(#[serde(deserialize_with = "deserialize_id")] String);

    Option::<Wrapped>::deserialize(deserializer).map(|opt| opt.map(|Wrapped(id)| id))
}

/// Helper to deserialize nullable strings as empty string
pub(crate) fn deserialize_nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(|opt| opt.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(deserialize_with = "deserialize_id")]
        id: String,
        #[serde(default, deserialize_with = "deserialize_nullable_string")]
        name: String,
    }

    #[test]
    fn test_id_accepts_string_and_number() {
        let a: Holder = serde_json::from_str(r#"{"id":"abc"}"#).unwrap();
        let b: Holder = serde_json::from_str(r#"{"id":17,"name":null}"#).unwrap();
        assert_eq!(a.id, "abc");
        assert_eq!(b.id, "17");
        assert_eq!(b.name, "");
    }

    #[test]
    fn test_optional_id() {
        #[derive(Deserialize)]
        struct MaybeId {
            #[serde(default, deserialize_with = "deserialize_optional_id")]
            id: Option<String>,
        }
        let missing: MaybeId = serde_json::from_str("{}").unwrap();
        let null: MaybeId = serde_json::from_str(r#"{"id":null}"#).unwrap();
        let number: MaybeId = serde_json::from_str(r#"{"id":7}"#).unwrap();
        assert_eq!(missing.id, None);
        assert_eq!(null.id, None);
        assert_eq!(number.id.as_deref(), Some("7"));
    }
}
