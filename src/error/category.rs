//! Error category classification.
//!
//! Categories drive the handling decision for a failed operation: whether it
//! can be retried, and what kind of hint the UI layer should show.

use std::fmt;

/// High-level categorization of errors for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection, DNS or timeout failures. Transient.
    Network,

    /// Backend-side failures: HTTP 5xx or an `error` event in the stream.
    Server,

    /// Persistence collaborator failures (create/delete/rename/history).
    /// Recovered locally; the chat path keeps working.
    Persistence,

    /// Programming errors or invalid client state.
    Client,

    /// Invalid input from the caller.
    User,
}

impl ErrorCategory {
    /// Returns true if errors in this category are generally transient
    /// and the operation can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCategory::Network | ErrorCategory::Server | ErrorCategory::Persistence
        )
    }

    /// Returns a short label for the category suitable for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Server => "server",
            ErrorCategory::Persistence => "persistence",
            ErrorCategory::Client => "client",
            ErrorCategory::User => "user",
        }
    }

    /// Returns suggested recovery actions for this category.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "Check your network connection and try again",
            ErrorCategory::Server => {
                "The server may be experiencing issues. Please try again later"
            }
            ErrorCategory::Persistence => {
                "Your conversation is kept locally and will be saved on the next message"
            }
            ErrorCategory::Client => "This may be a bug. Please report this issue if it persists",
            ErrorCategory::User => "Please check your input and try again",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
