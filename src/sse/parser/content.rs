//! Reply content parsers: token, answer, message.

use super::payload;
use crate::sse::events::{EventParseError, StreamEvent};
use crate::sse::payloads::{AnswerPayload, TextPayload, TokenPayload};

/// A token without content carries nothing and is skipped. Empty strings and
/// whitespace are kept: they are part of the reply.
pub(super) fn parse_token_event(
    data: serde_json::Value,
) -> Result<Option<StreamEvent>, EventParseError> {
    let token: TokenPayload = payload("token", data)?;
    Ok(token.content.map(|content| StreamEvent::Token {
        content,
        is_final: token.is_final.unwrap_or(false),
    }))
}

/// `answer` without content is skipped.
pub(super) fn parse_answer_event(
    data: serde_json::Value,
) -> Result<Option<StreamEvent>, EventParseError> {
    let answer: AnswerPayload = payload("answer", data)?;
    Ok(answer
        .content
        .filter(|c| !c.is_empty())
        .map(|content| StreamEvent::Answer {
            content,
            sources: answer.sources,
        }))
}

pub(super) fn parse_message_event(
    data: serde_json::Value,
) -> Result<Option<StreamEvent>, EventParseError> {
    let message: TextPayload = payload("message", data)?;
    Ok(message
        .content
        .filter(|c| !c.is_empty())
        .map(|content| StreamEvent::Message { content }))
}
