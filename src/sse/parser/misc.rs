//! Lifecycle and side-channel event parsers

use super::payload;
use crate::sse::events::{EventParseError, StreamEvent};
use crate::sse::payloads::{
    ErrorPayload, NodeUpdatePayload, SourcesPayload, StartPayload, TextPayload,
};

const UNKNOWN_ERROR: &str = "Unknown stream error";

pub(super) fn parse_start_event(
    data: serde_json::Value,
) -> Result<Option<StreamEvent>, EventParseError> {
    let start: StartPayload = payload("start", data)?;
    Ok(Some(StreamEvent::Start {
        message: start.message,
        session_id: start.session_id,
    }))
}

/// Non-string node content is rendered as JSON text.
pub(super) fn parse_node_update_event(
    data: serde_json::Value,
) -> Result<Option<StreamEvent>, EventParseError> {
    let update: NodeUpdatePayload = payload("node_update", data)?;
    let content = match update.content {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    Ok(Some(StreamEvent::NodeUpdate {
        node_name: update.node_name.unwrap_or_default(),
        content,
    }))
}

pub(super) fn parse_sources_event(
    data: serde_json::Value,
) -> Result<Option<StreamEvent>, EventParseError> {
    let sources: SourcesPayload = payload("sources", data)?;
    Ok(sources
        .sources
        .map(|sources| StreamEvent::Sources { sources }))
}

pub(super) fn parse_complete_event(
    data: serde_json::Value,
) -> Result<Option<StreamEvent>, EventParseError> {
    let complete: TextPayload = payload("complete", data)?;
    Ok(Some(StreamEvent::Complete {
        message: complete.message,
    }))
}

/// The backend puts a short summary in `message` and the detail in `error`;
/// the summary wins. Either may be any JSON value, so this never fails: an
/// `error` line always ends the stream.
pub(super) fn parse_error_event(
    data: serde_json::Value,
) -> Result<Option<StreamEvent>, EventParseError> {
    let error = ErrorPayload::from_value(data);
    let message = error_text(error.message)
        .or_else(|| error_text(error.error))
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
    Ok(Some(StreamEvent::Error { message }))
}

/// Empty strings, `false` and `null` carry no text; other non-strings are
/// rendered as JSON.
fn error_text(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null | serde_json::Value::Bool(false) => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use crate::sse::{parse_data_line, ParsedLine, StreamEvent};

    fn event(line: &str) -> StreamEvent {
        match parse_data_line(line) {
            ParsedLine::Event(event) => event,
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn test_error_prefers_message_over_error() {
        assert_eq!(
            event(r#"data: {"type":"error","error":"Traceback...","message":"processing failed"}"#),
            StreamEvent::Error {
                message: "processing failed".to_string()
            }
        );
        assert_eq!(
            event(r#"data: {"type":"error","error":"boom"}"#),
            StreamEvent::Error {
                message: "boom".to_string()
            }
        );
        assert_eq!(
            event(r#"data: {"type":"error"}"#),
            StreamEvent::Error {
                message: "Unknown stream error".to_string()
            }
        );
    }

    #[test]
    fn test_error_with_structured_fields_is_still_an_error() {
        assert_eq!(
            event(r#"data: {"type":"error","error":{"code":500},"message":null}"#),
            StreamEvent::Error {
                message: r#"{"code":500}"#.to_string()
            }
        );
        assert_eq!(
            event(r#"data: {"type":"error","message":"","error":42}"#),
            StreamEvent::Error {
                message: "42".to_string()
            }
        );
        assert_eq!(
            event(r#"data: {"type":"error","message":false,"error":[]}"#),
            StreamEvent::Error {
                message: "[]".to_string()
            }
        );
    }

    #[test]
    fn test_node_update() {
        assert_eq!(
            event(r#"data: {"type":"node_update","node_name":"retrieve","content":"3 docs"}"#),
            StreamEvent::NodeUpdate {
                node_name: "retrieve".to_string(),
                content: "3 docs".to_string()
            }
        );
    }

    #[test]
    fn test_node_update_object_content() {
        match event(r#"data: {"type":"node_update","node_name":"grade","content":{"score":1}}"#) {
            StreamEvent::NodeUpdate { content, .. } => assert_eq!(content, r#"{"score":1}"#),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_start_and_complete() {
        assert_eq!(
            event(r#"data: {"type":"start","session_id":"c1","user_id":"u","message":"go"}"#),
            StreamEvent::Start {
                message: Some("go".to_string()),
                session_id: Some("c1".to_string())
            }
        );
        assert_eq!(
            event(r#"data: {"type":"complete"}"#),
            StreamEvent::Complete { message: None }
        );
    }

    #[test]
    fn test_sources_without_list_is_ignored() {
        assert!(matches!(
            parse_data_line(r#"data: {"type":"sources","sources":null}"#),
            ParsedLine::Ignored(_)
        ));
    }
}
