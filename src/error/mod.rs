//! Error handling for the chat core.
//!
//! | Category | Source | Retryable |
//! |----------|--------|-----------|
//! | Network | connection failures, timeouts | Yes |
//! | Server | 5xx, `error` stream events | Yes |
//! | Persistence | create/delete/rename/history calls | Yes |
//! | Client | 4xx, unreadable responses | No |
//! | User | invalid input, concurrent send, cancellation | No |

mod category;
mod chat_error;
mod result;

pub use category::ErrorCategory;
pub use chat_error::ChatError;
pub use result::{ChatResult, PersistenceResultExt};

pub use crate::traits::http::HttpError;
