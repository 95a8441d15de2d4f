//! Trait seams for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - HTTP operations (GET, POST, PUT, DELETE, streaming POST)
//! - [`CredentialsProvider`] - Authorization header supplier
//! - [`ConversationPersistence`] - Conversation create/delete/rename/history

pub mod credentials;
pub mod http;
pub mod persistence;

pub use credentials::{CredentialsError, CredentialsProvider};
pub use http::{ByteStream, Headers, HttpClient, HttpError, Response};
pub use persistence::ConversationPersistence;
