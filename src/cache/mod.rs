//! Conversation collection cache
//!
//! Holds every known conversation with its timeline, the current selection,
//! the single local draft, and the cancellation handles of active streams.
//! All methods are synchronous; the reconciler serializes access.

mod conversation;
mod message;
mod reconciliation;

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use crate::models::Conversation;

/// Local state of the conversation collection.
#[derive(Debug, Default)]
pub struct ConversationCache {
    /// Conversations indexed by id
    pub(crate) conversations: HashMap<String, Conversation>,
    /// Display order of conversation ids (most recent first)
    pub(crate) order: Vec<String>,
    /// Currently selected conversation
    pub(crate) current: Option<String>,
    /// Id of the sole unsaved conversation, if any
    pub(crate) draft_id: Option<String>,
    /// Draft id → backend id, for callers still holding a draft id after
    /// promotion
    pub(crate) pending_to_real: HashMap<String, String>,
    /// Cancellation handles of in-flight streams, by conversation id
    pub(crate) active_streams: HashMap<String, CancellationToken>,
}

impl ConversationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every conversation and cancel every stream.
    pub fn clear(&mut self) {
        for token in self.active_streams.values() {
            token.cancel();
        }
        self.conversations.clear();
        self.order.clear();
        self.current = None;
        self.draft_id = None;
        self.pending_to_real.clear();
        self.active_streams.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cache_is_empty() {
        let cache = ConversationCache::new();
        assert_eq!(cache.len(), 0);
        assert!(cache.conversations().is_empty());
        assert!(cache.current().is_none());
    }

    #[test]
    fn test_clear_cancels_streams() {
        let mut cache = ConversationCache::new();
        let id = cache.create_draft();
        let token = CancellationToken::new();
        cache.begin_stream(&id, token.clone()).unwrap();

        cache.clear();

        assert!(token.is_cancelled());
        assert!(cache.is_empty());
        assert!(cache.draft().is_none());
    }
}
