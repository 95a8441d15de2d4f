//! Persistence collaborator seam.
//!
//! Conversation metadata and history live in the backend. The reconciler only
//! talks to them through this trait, so tests and embedders can swap in their
//! own store.

use async_trait::async_trait;

use crate::error::ChatResult;
use crate::history::HistoryRecord;
use crate::models::ConversationRecord;

#[async_trait]
pub trait ConversationPersistence: Send + Sync {
    /// Create a conversation and return the backend-assigned identity.
    async fn create_conversation(&self, user_id: &str, title: &str)
        -> ChatResult<ConversationRecord>;

    async fn delete_conversation(&self, conversation_id: &str) -> ChatResult<()>;

    async fn rename_conversation(&self, conversation_id: &str, title: &str) -> ChatResult<()>;

    /// Conversations of a user, most recent first.
    async fn list_conversations(&self, user_id: &str) -> ChatResult<Vec<ConversationRecord>>;

    /// Stored timeline records of one conversation.
    async fn conversation_history(&self, conversation_id: &str) -> ChatResult<Vec<HistoryRecord>>;
}
