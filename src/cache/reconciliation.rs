//! Draft promotion and id reconciliation for ConversationCache

use tracing::{debug, info};

use crate::models::{parse_timestamp, ConversationRecord};

use super::ConversationCache;

impl ConversationCache {
    /// Resolve a conversation id, following draft → backend mappings so that
    /// callers still holding a draft id reach the promoted conversation.
    pub(crate) fn resolve_id<'a>(&'a self, id: &'a str) -> &'a str {
        self.pending_to_real
            .get(id)
            .map(|s| s.as_str())
            .unwrap_or(id)
    }

    /// Turn the draft `draft_id` into the persisted conversation `record`.
    ///
    /// The conversation keeps its timeline, its position and its selection;
    /// only its identity and metadata change. An active stream follows the
    /// new id. Returns the backend id, or `None` if `draft_id` is not the
    /// current draft.
    pub fn promote_draft(&mut self, draft_id: &str, record: ConversationRecord) -> Option<String> {
        if self.draft_id.as_deref() != Some(draft_id) {
            debug!(draft_id, "Promotion target is not the draft");
            return None;
        }
        let mut conversation = self.conversations.remove(draft_id)?;
        let real_id = record.conversation_id;

        conversation.id = real_id.clone();
        conversation.persisted = true;
        if !record.title.trim().is_empty() {
            conversation.title = record.title;
        }
        if let Some(created) = record.created_at.as_deref().and_then(parse_timestamp) {
            conversation.created_at = created;
        }
        conversation.updated_at = record
            .updated_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(conversation.created_at);

        if real_id != draft_id {
            // A stale entry under the backend id loses to the promoted draft.
            self.order.retain(|id| id != &real_id);
        }
        if let Some(pos) = self.order.iter().position(|id| id == draft_id) {
            self.order[pos] = real_id.clone();
        }
        self.conversations.insert(real_id.clone(), conversation);

        if let Some(token) = self.active_streams.remove(draft_id) {
            self.active_streams.insert(real_id.clone(), token);
        }
        if self.current.as_deref() == Some(draft_id) {
            self.current = Some(real_id.clone());
        }
        self.draft_id = None;
        if real_id != draft_id {
            self.pending_to_real
                .insert(draft_id.to_string(), real_id.clone());
        }

        info!(draft_id, conversation_id = %real_id, "Draft conversation promoted");
        Some(real_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;
    use tokio_util::sync::CancellationToken;

    fn record(id: &str, title: &str) -> ConversationRecord {
        ConversationRecord {
            conversation_id: id.to_string(),
            title: title.to_string(),
            created_at: Some("2024-05-01T10:00:00".to_string()),
            updated_at: None,
        }
    }

    #[test]
    fn test_promote_keeps_timeline_and_selection() {
        let mut cache = ConversationCache::new();
        let draft = cache.create_draft();
        cache.get_mut(&draft).unwrap().timeline.push(Message::user("hello"));

        let real = cache.promote_draft(&draft, record("42", "hello")).unwrap();

        assert_eq!(real, "42");
        assert!(cache.draft().is_none());
        assert_eq!(cache.current_id(), Some("42"));
        let conversation = cache.get("42").unwrap();
        assert!(conversation.persisted);
        assert_eq!(conversation.title, "hello");
        assert_eq!(conversation.timeline.len(), 1);
        assert_eq!(cache.conversations().len(), 1);
    }

    #[test]
    fn test_draft_id_resolves_after_promotion() {
        let mut cache = ConversationCache::new();
        let draft = cache.create_draft();
        cache.promote_draft(&draft, record("42", "t"));
        assert_eq!(cache.resolve_id(&draft), "42");
        assert_eq!(cache.get(&draft).unwrap().id, "42");
    }

    #[test]
    fn test_promote_moves_active_stream() {
        let mut cache = ConversationCache::new();
        let draft = cache.create_draft();
        cache.begin_stream(&draft, CancellationToken::new()).unwrap();
        cache.promote_draft(&draft, record("42", "t"));
        assert!(cache.is_streaming("42"));
        assert!(cache.is_streaming(&draft));
    }

    #[test]
    fn test_promote_keeps_local_title_when_backend_has_none() {
        let mut cache = ConversationCache::new();
        let draft = cache.create_draft();
        cache.set_title(&draft, "local");
        cache.promote_draft(&draft, record("42", ""));
        assert_eq!(cache.get("42").unwrap().title, "local");
    }

    #[test]
    fn test_promote_non_draft_is_rejected() {
        let mut cache = ConversationCache::new();
        cache.create_draft();
        assert!(cache.promote_draft("other", record("42", "t")).is_none());
        assert!(cache.get("42").is_none());
    }
}
