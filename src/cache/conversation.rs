//! Collection management methods for ConversationCache

use tracing::debug;

use crate::models::{Conversation, ConversationRecord, Message};

use super::ConversationCache;

impl ConversationCache {
    /// All conversations in display order.
    pub fn conversations(&self) -> Vec<&Conversation> {
        self.order
            .iter()
            .filter_map(|id| self.conversations.get(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Look up a conversation, following draft → backend id mappings.
    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.get(self.resolve_id(id))
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        let id = self.resolve_id(id).to_string();
        self.conversations.get_mut(&id)
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current(&self) -> Option<&Conversation> {
        self.current
            .as_deref()
            .and_then(|id| self.conversations.get(id))
    }

    /// Timeline of the current conversation, empty when nothing is selected.
    pub fn current_messages(&self) -> &[Message] {
        self.current()
            .map(|c| c.timeline.messages())
            .unwrap_or(&[])
    }

    pub fn draft(&self) -> Option<&Conversation> {
        self.draft_id
            .as_deref()
            .and_then(|id| self.conversations.get(id))
    }

    /// Return the draft to write into, creating it if needed.
    ///
    /// A draft that is already selected is reused as is. A draft that is not
    /// selected is discarded and replaced, so the collection never holds two
    /// unsaved conversations. The draft becomes the current conversation.
    pub fn create_draft(&mut self) -> String {
        if let Some(id) = self.draft_id.clone() {
            if self.current.as_deref() == Some(id.as_str()) {
                return id;
            }
            debug!(draft_id = %id, "Discarding unselected draft");
            self.remove(&id);
        }

        let draft = Conversation::draft();
        let id = draft.id.clone();
        self.order.insert(0, id.clone());
        self.conversations.insert(id.clone(), draft);
        self.draft_id = Some(id.clone());
        self.current = Some(id.clone());
        id
    }

    /// Select a conversation. Returns false if it is unknown.
    pub fn select(&mut self, id: &str) -> bool {
        let id = self.resolve_id(id).to_string();
        if !self.conversations.contains_key(&id) {
            return false;
        }
        self.current = Some(id);
        true
    }

    /// Remove a conversation and everything attached to it, cancelling its
    /// stream. Clears the selection if it pointed here.
    ///
    /// Returns `true` if the conversation existed.
    pub fn remove(&mut self, id: &str) -> bool {
        let id = self.resolve_id(id).to_string();
        let existed = self.conversations.remove(&id).is_some();

        self.order.retain(|existing| existing != &id);
        if let Some(token) = self.active_streams.remove(&id) {
            token.cancel();
        }
        self.pending_to_real.remove(&id);
        self.pending_to_real.retain(|_, real| real != &id);
        if self.draft_id.as_deref() == Some(id.as_str()) {
            self.draft_id = None;
        }
        if self.current.as_deref() == Some(id.as_str()) {
            self.current = None;
        }

        existed
    }

    pub fn set_title(&mut self, id: &str, title: &str) -> bool {
        match self.get_mut(id) {
            Some(conversation) => {
                conversation.title = title.to_string();
                conversation.touch();
                true
            }
            None => false,
        }
    }

    /// Replace the persisted part of the collection with a backend listing.
    ///
    /// The draft stays at the front. Known conversations keep their local
    /// timeline. The selection is cleared if it is no longer listed.
    pub fn replace_persisted(&mut self, records: Vec<ConversationRecord>) {
        let mut previous = std::mem::take(&mut self.conversations);
        self.order.clear();

        if let Some(draft) = self.draft_id.as_ref().and_then(|id| previous.remove(id)) {
            self.order.push(draft.id.clone());
            self.conversations.insert(draft.id.clone(), draft);
        }

        for record in records {
            let mut conversation = Conversation::from_record(record);
            if self.conversations.contains_key(&conversation.id) {
                continue;
            }
            if let Some(existing) = previous.remove(&conversation.id) {
                conversation.timeline = existing.timeline;
            }
            self.order.push(conversation.id.clone());
            self.conversations.insert(conversation.id.clone(), conversation);
        }

        for (id, token) in &self.active_streams {
            if !self.conversations.contains_key(id) {
                token.cancel();
            }
        }
        let conversations = &self.conversations;
        self.active_streams.retain(|id, _| conversations.contains_key(id));
        if self
            .current
            .as_ref()
            .map_or(false, |id| !self.conversations.contains_key(id))
        {
            self.current = None;
        }
    }

    /// Install a freshly fetched timeline, keeping an in-flight streaming
    /// message.
    pub fn load_timeline(&mut self, id: &str, messages: Vec<Message>) -> bool {
        match self.get_mut(id) {
            Some(conversation) => {
                conversation.timeline.reload(messages);
                true
            }
            None => false,
        }
    }

    pub fn toggle_expanded(&mut self, conversation_id: &str, message_id: &str) -> bool {
        self.get_mut(conversation_id)
            .map_or(false, |c| c.toggle_expanded(message_id))
    }
}
