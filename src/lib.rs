//! ragchat - streaming chat client core for a retrieval-augmented chat backend
//!
//! Decodes the backend's `data: {json}` stream into typed events, drives one
//! streaming session per send with a non-streaming fallback, and reconciles a
//! local conversation collection (drafts, promotion, history reloads) with
//! the backend.
//!
//! ```ignore
//! use ragchat::{BackendClient, ClientConfig, ConversationReconciler, SendOptions};
//!
//! let backend = BackendClient::with_reqwest(ClientConfig::from_env())?;
//! let chat = ConversationReconciler::new(backend);
//! chat.load_conversations().await?;
//! chat.send_message("What changed in the 2024 report?", SendOptions::default()).await?;
//! for message in chat.current_messages() {
//!     println!("{}: {}", message.role, message.content);
//! }
//! ```

pub mod adapters;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod models;
pub mod reconciler;
pub mod session;
pub mod sse;
pub mod traits;

pub use backend::BackendClient;
pub use config::ClientConfig;
pub use error::{ChatError, ChatResult, ErrorCategory};
pub use models::{Conversation, Message, MessageRole, SendOptions};
pub use reconciler::{ConversationReconciler, Delivery, SendOutcome, FAILURE_MESSAGE};
pub use session::{SessionEvent, SessionState, StreamSession};
pub use sse::StreamEvent;
