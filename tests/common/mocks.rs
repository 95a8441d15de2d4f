//! Stream-line and response builders for test fixtures.

pub use ragchat::adapters::mock::{MockHttpClient, MockResponse, RecordedRequest};
pub use ragchat::traits::{Headers, HttpClient, HttpError, Response};

use serde_json::{json, Value};

pub const CHAT_STREAM: &str = "/api/llm/chat/stream";
pub const CHAT: &str = "/api/llm/chat";
pub const CONVERSATION: &str = "/api/llm/conversation";
pub const HISTORY: &str = "/api/llm/history";

/// `data: <json>` line.
pub fn data_line(payload: Value) -> String {
    format!("data: {payload}")
}

pub fn token_line(content: &str, is_final: bool) -> String {
    data_line(json!({"type": "token", "content": content, "is_final": is_final}))
}

pub fn sources_line(titles: &[&str]) -> String {
    let sources: Vec<Value> = titles.iter().map(|t| json!({"title": t})).collect();
    data_line(json!({"type": "sources", "sources": sources}))
}

pub fn node_update_line(node_name: &str, content: &str) -> String {
    data_line(json!({"type": "node_update", "node_name": node_name, "content": content}))
}

pub fn error_line(message: &str) -> String {
    data_line(json!({"type": "error", "message": message}))
}

pub fn complete_line() -> String {
    data_line(json!({"type": "complete", "message": "done"}))
}

/// `{status: 200, data, msg}` success envelope.
pub fn envelope(data: Value) -> Value {
    json!({"status": 200, "data": data, "msg": "ok"})
}

pub fn failed_envelope(status: u16, msg: &str) -> Value {
    json!({"status": status, "data": null, "msg": msg})
}

pub fn server_error(status: u16) -> MockResponse {
    MockResponse::Success(Response::new(status, "internal error"))
}
