use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::message::Message;

/// Ordered message sequence with O(1) lookup by message id.
///
/// Messages are only ever appended or mutated in place while a conversation
/// is open, so the id → index map never needs rebuilding until the whole
/// timeline is replaced by a reload.
///
/// The timeline also tracks the current exchange: the single streaming
/// assistant message, and the assistant message the exchange last finalized
/// (the target of a late `sources` event).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Message>", into = "Vec<Message>")]
pub struct Timeline {
    messages: Vec<Message>,
    index: HashMap<String, usize>,
    streaming_id: Option<String>,
    last_finalized: Option<String>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.index.get(id).map(|&i| &self.messages[i])
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Message> {
        match self.index.get(id) {
            Some(&i) => self.messages.get_mut(i),
            None => None,
        }
    }

    pub fn streaming(&self) -> Option<&Message> {
        self.streaming_id.as_deref().and_then(|id| self.get(id))
    }

    pub fn has_streaming(&self) -> bool {
        self.streaming_id.is_some()
    }

    /// The assistant message the current exchange finalized, if any.
    pub fn last_finalized(&self) -> Option<&Message> {
        self.last_finalized.as_deref().and_then(|id| self.get(id))
    }

    /// Append a message and return its id.
    ///
    /// Pushing a streaming message freezes any previous streaming one, so at
    /// most one message is ever streaming.
    pub fn push(&mut self, message: Message) -> String {
        if message.is_streaming {
            if let Some(previous) = self.streaming_id.take() {
                if let Some(msg) = self.get_mut(&previous) {
                    msg.is_streaming = false;
                }
            }
            self.streaming_id = Some(message.id.clone());
        }
        let id = message.id.clone();
        self.index.insert(id.clone(), self.messages.len());
        self.messages.push(message);
        id
    }

    /// Start tracking a new user → assistant exchange.
    pub fn begin_exchange(&mut self) {
        self.last_finalized = None;
    }

    /// Append an incremental token, creating the streaming message on the
    /// first one.
    pub fn append_token(&mut self, token: &str) -> String {
        if let Some(id) = self.streaming_id.clone() {
            if let Some(msg) = self.get_mut(&id) {
                msg.append_token(token);
                return id;
            }
        }
        self.push(Message::streaming_assistant(token))
    }

    /// Set the complete reply text of the current exchange.
    ///
    /// Targets the streaming message, else the message this exchange already
    /// finalized, else appends a new assistant message. The target becomes the
    /// exchange's finalized message.
    pub fn settle_reply(&mut self, content: &str) -> String {
        let target = self
            .streaming_id
            .take()
            .or_else(|| self.last_finalized.clone())
            .filter(|id| self.index.contains_key(id));

        let id = match target {
            Some(id) => {
                if let Some(msg) = self.get_mut(&id) {
                    msg.finalize(content);
                }
                id
            }
            None => self.push(Message::assistant(content)),
        };
        self.last_finalized = Some(id.clone());
        id
    }

    /// Attach citations to the exchange's finalized message. No-op (returns
    /// false) when nothing has been finalized yet.
    pub fn attach_sources(&mut self, sources: Vec<serde_json::Value>) -> bool {
        let Some(id) = self.last_finalized.clone() else {
            return false;
        };
        match self.get_mut(&id) {
            Some(msg) => {
                msg.sources = Some(sources);
                true
            }
            None => false,
        }
    }

    pub fn push_node_update(&mut self, node_name: &str, content: &str) -> String {
        self.push(Message::node_update(node_name, content))
    }

    /// Freeze the streaming message with a cancellation marker.
    pub fn cancel_streaming(&mut self) -> bool {
        let Some(id) = self.streaming_id.take() else {
            return false;
        };
        match self.get_mut(&id) {
            Some(msg) => {
                msg.cancel();
                true
            }
            None => false,
        }
    }

    pub fn toggle_expanded(&mut self, id: &str) -> bool {
        match self.get_mut(id) {
            Some(msg) => {
                msg.expanded = !msg.expanded;
                true
            }
            None => false,
        }
    }

    /// Replace the content with freshly loaded messages, carrying over the
    /// in-flight streaming message if there is one.
    pub fn reload(&mut self, fetched: Vec<Message>) {
        let streaming = self.streaming().cloned();
        let last_finalized = self.last_finalized.take();

        *self = Timeline::from(fetched);
        if let Some(msg) = streaming {
            if !self.index.contains_key(&msg.id) {
                self.push(msg);
            }
        }
        self.last_finalized = last_finalized.filter(|id| self.index.contains_key(id));
    }
}

impl From<Vec<Message>> for Timeline {
    fn from(messages: Vec<Message>) -> Self {
        let mut timeline = Timeline::new();
        for message in messages {
            timeline.push(message);
        }
        timeline
    }
}

impl From<Timeline> for Vec<Message> {
    fn from(timeline: Timeline) -> Self {
        timeline.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageRole;

    #[test]
    fn test_tokens_accumulate_then_final_replaces() {
        let mut timeline = Timeline::new();
        timeline.push(Message::user("hi"));
        timeline.begin_exchange();

        let first = timeline.append_token("Hel");
        let second = timeline.append_token("lo");
        assert_eq!(first, second);
        assert_eq!(timeline.streaming().unwrap().content, "Hello");

        let settled = timeline.settle_reply("Hello!");
        assert_eq!(settled, first);
        let msg = timeline.get(&settled).unwrap();
        assert_eq!(msg.content, "Hello!");
        assert!(!msg.is_streaming);
        assert!(!timeline.has_streaming());
        assert_eq!(timeline.len(), 2);
    }

    #[test]
    fn test_sources_attach_only_after_finalize() {
        let mut timeline = Timeline::new();
        timeline.begin_exchange();
        assert!(!timeline.attach_sources(vec![serde_json::json!({"title": "a"})]));

        timeline.append_token("partial");
        assert!(!timeline.attach_sources(vec![serde_json::json!({"title": "a"})]));

        let id = timeline.settle_reply("done");
        assert!(timeline.attach_sources(vec![serde_json::json!({"title": "a"})]));
        assert_eq!(timeline.get(&id).unwrap().sources.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_begin_exchange_forgets_previous_reply() {
        let mut timeline = Timeline::new();
        timeline.begin_exchange();
        timeline.settle_reply("first answer");
        timeline.begin_exchange();
        assert!(timeline.last_finalized().is_none());
        assert!(!timeline.attach_sources(vec![]));
    }

    #[test]
    fn test_settle_without_stream_appends_assistant() {
        let mut timeline = Timeline::new();
        timeline.push(Message::user("q"));
        timeline.begin_exchange();
        let id = timeline.settle_reply("answer");
        let msg = timeline.get(&id).unwrap();
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(timeline.len(), 2);

        // a second settle in the same exchange replaces, not appends
        timeline.settle_reply("better answer");
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.last().unwrap().content, "better answer");
    }

    #[test]
    fn test_single_streaming_message() {
        let mut timeline = Timeline::new();
        timeline.push(Message::streaming_assistant("a"));
        timeline.push(Message::streaming_assistant("b"));
        let streaming: Vec<_> = timeline.messages().iter().filter(|m| m.is_streaming).collect();
        assert_eq!(streaming.len(), 1);
        assert_eq!(streaming[0].content, "b");
    }

    #[test]
    fn test_cancel_streaming() {
        let mut timeline = Timeline::new();
        assert!(!timeline.cancel_streaming());
        timeline.append_token("half");
        assert!(timeline.cancel_streaming());
        assert_eq!(timeline.last().unwrap().content, "half\n\n[Cancelled]");
        assert!(!timeline.has_streaming());
    }

    #[test]
    fn test_reload_keeps_streaming_message() {
        let mut timeline = Timeline::new();
        timeline.push(Message::user("old"));
        timeline.append_token("in flight");

        timeline.reload(vec![Message::user("q1"), Message::assistant("a1")]);
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.streaming().unwrap().content, "in flight");
        assert_eq!(timeline.messages()[0].content, "q1");
    }

    #[test]
    fn test_toggle_expanded() {
        let mut timeline = Timeline::new();
        let id = timeline.push_node_update("retrieve", "searching");
        assert!(!timeline.get(&id).unwrap().expanded);
        assert!(timeline.toggle_expanded(&id));
        assert!(timeline.get(&id).unwrap().expanded);
        assert!(!timeline.toggle_expanded("missing"));
    }

    #[test]
    fn test_serializes_as_message_list() {
        let mut timeline = Timeline::new();
        timeline.push(Message::user("hello"));
        let json = serde_json::to_value(&timeline).unwrap();
        assert!(json.is_array());
        let back: Timeline = serde_json::from_value(json).unwrap();
        assert_eq!(back.len(), 1);
        assert!(back.get(&timeline.messages()[0].id).is_some());
    }
}
