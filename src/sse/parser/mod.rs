//! Event parser: decoded lines in, typed stream events out.
//!
//! Only lines starting with exactly `data: ` carry events. Their remainder is a
//! JSON object whose `type` field selects the event. A malformed line is
//! logged and dropped; it never ends the stream. An `error` event does.

mod content;
mod misc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::ChatError;
use crate::sse::events::{EventParseError, ParsedLine, StreamEvent};

use content::{parse_answer_event, parse_message_event, parse_token_event};
use misc::{
    parse_complete_event, parse_error_event, parse_node_update_event, parse_sources_event,
    parse_start_event,
};

/// Line prefix of an event payload.
pub const DATA_PREFIX: &str = "data: ";

fn payload<T: DeserializeOwned>(
    event_type: &str,
    data: serde_json::Value,
) -> Result<T, EventParseError> {
    serde_json::from_value(data).map_err(|e| EventParseError::InvalidPayload {
        event_type: event_type.to_string(),
        source: e.to_string(),
    })
}

/// Classify a single decoded line.
pub fn parse_data_line(line: &str) -> ParsedLine {
    if line.trim().is_empty() {
        return ParsedLine::Blank;
    }

    let Some(json) = line.strip_prefix(DATA_PREFIX) else {
        return ParsedLine::Ignored("not a data line".to_string());
    };

    let data: serde_json::Value = match serde_json::from_str(json) {
        Ok(data) => data,
        Err(e) => {
            return ParsedLine::Malformed(EventParseError::InvalidJson {
                source: e.to_string(),
            })
        }
    };

    let Some(event_type) = data.get("type").and_then(|t| t.as_str()).map(str::to_owned) else {
        return ParsedLine::Malformed(EventParseError::MissingType);
    };

    let parsed = match event_type.as_str() {
        "start" => parse_start_event(data),
        "token" => parse_token_event(data),
        "node_update" => parse_node_update_event(data),
        "sources" => parse_sources_event(data),
        "complete" => parse_complete_event(data),
        "answer" => parse_answer_event(data),
        "message" => parse_message_event(data),
        "error" => parse_error_event(data),
        other => return ParsedLine::Ignored(format!("unknown event type '{other}'")),
    };

    match parsed {
        Ok(Some(event)) => ParsedLine::Event(event),
        Ok(None) => ParsedLine::Ignored(format!("'{event_type}' event without content")),
        Err(e) => ParsedLine::Malformed(e),
    }
}

/// Stateful wrapper around [`parse_data_line`] that logs what it drops and
/// turns `error` events into errors.
#[derive(Debug, Default)]
pub struct EventParser {
    events: u64,
    ignored: u64,
    malformed: u64,
}

impl EventParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one decoded line.
    ///
    /// Returns:
    /// - `Ok(Some(event))` - the line carried an event
    /// - `Ok(None)` - blank, ignored or malformed line (stream continues)
    /// - `Err(ChatError::Protocol)` - the backend reported an error; the stream
    ///   must not be read further
    pub fn feed_line(&mut self, line: &str) -> Result<Option<StreamEvent>, ChatError> {
        match parse_data_line(line) {
            ParsedLine::Blank => Ok(None),
            ParsedLine::Ignored(reason) => {
                self.ignored += 1;
                debug!(line = %line, reason = %reason, "Ignoring stream line");
                Ok(None)
            }
            ParsedLine::Malformed(e) => {
                self.malformed += 1;
                warn!(line = %line, error = %e, "Dropping malformed stream line");
                Ok(None)
            }
            ParsedLine::Event(StreamEvent::Error { message }) => {
                self.events += 1;
                Err(ChatError::protocol(message))
            }
            ParsedLine::Event(event) => {
                self.events += 1;
                Ok(Some(event))
            }
        }
    }

    pub fn events(&self) -> u64 {
        self.events
    }

    pub fn ignored(&self) -> u64 {
        self.ignored
    }

    pub fn malformed(&self) -> u64 {
        self.malformed
    }
}
