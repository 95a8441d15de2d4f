//! Unified error type for the chat core.

use std::time::Duration;

use thiserror::Error;

use super::category::ErrorCategory;
use crate::traits::credentials::CredentialsError;
use crate::traits::http::HttpError;

/// Every failure the chat core can surface to its caller.
///
/// Malformed stream lines never show up here: the event parser logs and
/// drops them (see [`crate::sse::EventParseError`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// Network or HTTP-status failure talking to the backend.
    #[error("transport error: {0}")]
    Transport(HttpError),

    /// The request ceiling elapsed. Kept apart from `Transport`.
    #[error("{operation} timed out after {duration_secs}s")]
    Timeout {
        operation: String,
        duration_secs: u64,
    },

    /// The stream was well-formed but the backend reported an error event.
    #[error("backend error: {message}")]
    Protocol { message: String },

    /// A persistence collaborator call failed.
    #[error("{operation} failed: {message}")]
    Persistence { operation: String, message: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("a stream is already in progress for conversation {conversation_id}")]
    StreamInProgress { conversation_id: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid JSON: {0}")]
    Json(String),
}

impl ChatError {
    pub fn protocol(message: impl Into<String>) -> Self {
        ChatError::Protocol {
            message: message.into(),
        }
    }

    pub fn persistence(operation: impl Into<String>, message: impl Into<String>) -> Self {
        ChatError::Persistence {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Map a transport failure of `operation`, reporting transport-level
    /// timeouts against the configured ceiling.
    pub fn from_transport(err: HttpError, operation: &str, ceiling: Duration) -> Self {
        match err {
            HttpError::Timeout(_) => ChatError::timeout(operation, ceiling),
            other => other.into(),
        }
    }

    pub fn timeout(operation: &str, ceiling: Duration) -> Self {
        ChatError::Timeout {
            operation: operation.to_string(),
            duration_secs: ceiling.as_secs(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ChatError::Transport(HttpError::ServerError { status, .. }) if *status < 500 => {
                ErrorCategory::Client
            }
            ChatError::Transport(HttpError::ServerError { .. }) => ErrorCategory::Server,
            ChatError::Transport(HttpError::InvalidUrl(_)) => ErrorCategory::Client,
            ChatError::Transport(_) | ChatError::Timeout { .. } => ErrorCategory::Network,
            ChatError::Protocol { .. } => ErrorCategory::Server,
            ChatError::Persistence { .. } => ErrorCategory::Persistence,
            ChatError::InvalidArgument(_) | ChatError::StreamInProgress { .. } => {
                ErrorCategory::User
            }
            ChatError::Cancelled => ErrorCategory::User,
            ChatError::Json(_) => ErrorCategory::Client,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::Transport(HttpError::Cancelled) => false,
            _ => self.category().is_retryable(),
        }
    }

    /// Short, readable text for the UI layer.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Transport(HttpError::ServerError { status, .. }) => {
                format!("The server answered with an error ({status}).")
            }
            ChatError::Transport(_) => "Unable to reach the chat server.".to_string(),
            ChatError::Timeout { duration_secs, .. } => {
                format!("The server did not answer within {duration_secs} seconds.")
            }
            ChatError::Protocol { message } => message.clone(),
            ChatError::Persistence { operation, .. } => {
                format!("Could not {operation}. Your changes are kept locally.")
            }
            ChatError::InvalidArgument(reason) => reason.clone(),
            ChatError::StreamInProgress { .. } => {
                "Please wait for the current reply to finish.".to_string()
            }
            ChatError::Cancelled => "The reply was cancelled.".to_string(),
            ChatError::Json(_) => "The server sent an unreadable response.".to_string(),
        }
    }

    /// Stable code for logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            ChatError::Transport(_) => "TRANSPORT",
            ChatError::Timeout { .. } => "TIMEOUT",
            ChatError::Protocol { .. } => "PROTOCOL",
            ChatError::Persistence { .. } => "PERSISTENCE",
            ChatError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ChatError::StreamInProgress { .. } => "STREAM_IN_PROGRESS",
            ChatError::Cancelled => "CANCELLED",
            ChatError::Json(_) => "JSON",
        }
    }

    pub fn recovery_hint(&self) -> &'static str {
        self.category().recovery_hint()
    }
}

impl From<HttpError> for ChatError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Cancelled => ChatError::Cancelled,
            other => ChatError::Transport(other),
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::Json(err.to_string())
    }
}

impl From<CredentialsError> for ChatError {
    fn from(err: CredentialsError) -> Self {
        ChatError::Transport(HttpError::Other(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_not_transport() {
        let err = ChatError::Timeout {
            operation: "chat stream".to_string(),
            duration_secs: 30,
        };
        assert_eq!(err.error_code(), "TIMEOUT");
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.to_string(), "chat stream timed out after 30s");
        assert!(!matches!(err, ChatError::Transport(_)));
    }

    #[test]
    fn test_transport_timeout_becomes_timeout() {
        let err = ChatError::from_transport(
            HttpError::Timeout("deadline".to_string()),
            "open chat stream",
            Duration::from_secs(30),
        );
        assert_eq!(err, ChatError::timeout("open chat stream", Duration::from_secs(30)));

        let err = ChatError::from_transport(
            HttpError::ConnectionFailed("refused".to_string()),
            "open chat stream",
            Duration::from_secs(30),
        );
        assert!(matches!(err, ChatError::Transport(HttpError::ConnectionFailed(_))));
    }

    #[test]
    fn test_server_error_categories() {
        let server = ChatError::Transport(HttpError::ServerError {
            status: 502,
            message: "bad gateway".to_string(),
        });
        assert_eq!(server.category(), ErrorCategory::Server);
        assert!(server.is_retryable());

        let client = ChatError::Transport(HttpError::ServerError {
            status: 422,
            message: "too long".to_string(),
        });
        assert_eq!(client.category(), ErrorCategory::Client);
        assert!(!client.is_retryable());
    }

    #[test]
    fn test_http_cancelled_maps_to_cancelled() {
        let err: ChatError = HttpError::Cancelled.into();
        assert_eq!(err, ChatError::Cancelled);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_protocol_user_message_is_backend_text() {
        let err = ChatError::protocol("model overloaded");
        assert_eq!(err.user_message(), "model overloaded");
        assert_eq!(err.category(), ErrorCategory::Server);
    }

    #[test]
    fn test_invalid_argument_not_retryable() {
        let err = ChatError::InvalidArgument("content is empty".to_string());
        assert_eq!(err.category(), ErrorCategory::User);
        assert!(!err.is_retryable());
        assert!(err.recovery_hint().contains("input"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{bad");
        let err: ChatError = parse.unwrap_err().into();
        assert_eq!(err.error_code(), "JSON");
    }
}
