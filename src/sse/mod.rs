//! Chat stream decoding.
//!
//! The backend answers a chat request with a chunked body of lines:
//! - `data: <json>` - one event, `type` field selects the kind
//! - empty line - separator
//! - anything else - ignored
//!
//! # Module structure
//! - `decoder` - byte chunks to complete lines (LineDecoder, decode_lines)
//! - `events` - StreamEvent, ParsedLine, EventParseError
//! - `payloads` - Internal payload deserialization structs
//! - `parser` - lines to events (EventParser, parse_data_line)

mod decoder;
mod events;
mod parser;
mod payloads;

pub use decoder::{decode_lines, LineDecoder, Lines};
pub use events::{EventParseError, ParsedLine, StreamEvent};
pub use parser::{parse_data_line, EventParser, DATA_PREFIX};
