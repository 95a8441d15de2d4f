//! Stream bookkeeping and event application for ConversationCache

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ChatError, ChatResult};
use crate::models::Message;
use crate::sse::StreamEvent;

use super::ConversationCache;

impl ConversationCache {
    /// Reserve the single stream slot of a conversation.
    pub fn begin_stream(&mut self, id: &str, token: CancellationToken) -> ChatResult<()> {
        let id = self.resolve_id(id).to_string();
        if self.active_streams.contains_key(&id) {
            return Err(ChatError::StreamInProgress {
                conversation_id: id,
            });
        }
        self.active_streams.insert(id, token);
        Ok(())
    }

    /// Release the stream slot. Returns false if none was held.
    pub fn end_stream(&mut self, id: &str) -> bool {
        let id = self.resolve_id(id).to_string();
        self.active_streams.remove(&id).is_some()
    }

    pub fn is_streaming(&self, id: &str) -> bool {
        self.active_streams.contains_key(self.resolve_id(id))
    }

    pub fn stream_token(&self, id: &str) -> Option<CancellationToken> {
        self.active_streams.get(self.resolve_id(id)).cloned()
    }

    /// Append the user's message and open a new exchange.
    pub fn push_user_message(&mut self, id: &str, content: &str) -> Option<String> {
        let conversation = self.get_mut(id)?;
        conversation.timeline.begin_exchange();
        let message_id = conversation.timeline.push(Message::user(content));
        conversation.touch();
        Some(message_id)
    }

    /// Apply one stream event to a conversation's timeline.
    ///
    /// Returns false when the event changed nothing (unknown conversation,
    /// bookkeeping events, sources with no finalized reply).
    pub fn apply_event(&mut self, id: &str, event: &StreamEvent) -> bool {
        let Some(conversation) = self.get_mut(id) else {
            debug!(conversation_id = id, "Event for unknown conversation dropped");
            return false;
        };
        let timeline = &mut conversation.timeline;

        match event {
            StreamEvent::Start { .. } => false,
            StreamEvent::Token { content, is_final } => {
                if *is_final {
                    timeline.settle_reply(content);
                } else {
                    timeline.append_token(content);
                }
                true
            }
            StreamEvent::NodeUpdate { node_name, content } => {
                timeline.push_node_update(node_name, content);
                true
            }
            StreamEvent::Sources { sources } => {
                let attached = timeline.attach_sources(sources.clone());
                if !attached {
                    debug!("Sources arrived before any finalized reply, ignoring");
                }
                attached
            }
            StreamEvent::Answer { content, sources } => {
                timeline.settle_reply(content);
                if let Some(sources) = sources {
                    timeline.attach_sources(sources.clone());
                }
                true
            }
            StreamEvent::Message { content } => {
                timeline.settle_reply(content);
                true
            }
            StreamEvent::Complete { .. } => {
                conversation.touch();
                true
            }
            StreamEvent::Error { message } => {
                warn!(error = %message, "Error event reached the timeline, ignoring");
                false
            }
        }
    }

    /// Settle a reply the stream left open because it ended without a final
    /// token. The accumulated text becomes the reply.
    pub fn complete_exchange(&mut self, id: &str) -> bool {
        let Some(conversation) = self.get_mut(id) else {
            return false;
        };
        let Some(content) = conversation.timeline.streaming().map(|m| m.content.clone()) else {
            return false;
        };
        conversation.timeline.settle_reply(&content);
        true
    }

    /// Replace the exchange's reply with a readable failure text.
    pub fn apply_failure(&mut self, id: &str, text: &str) -> bool {
        match self.get_mut(id) {
            Some(conversation) => {
                conversation.timeline.settle_reply(text);
                true
            }
            None => false,
        }
    }

    /// Settle the exchange with a non-streaming reply.
    pub fn apply_reply(
        &mut self,
        id: &str,
        text: &str,
        sources: Option<Vec<serde_json::Value>>,
    ) -> bool {
        let Some(conversation) = self.get_mut(id) else {
            return false;
        };
        conversation.timeline.settle_reply(text);
        if let Some(sources) = sources {
            conversation.timeline.attach_sources(sources);
        }
        conversation.touch();
        true
    }

    /// Freeze the streaming message of a conversation after cancellation.
    pub fn cancel_streaming_message(&mut self, id: &str) -> bool {
        self.get_mut(id)
            .map_or(false, |c| c.timeline.cancel_streaming())
    }
}
