//! Conversation reconciler.
//!
//! Drives the user-facing chat operations: drafts and their promotion,
//! sending with streaming and the one-shot fallback, switching, deleting and
//! listing conversations. Local state lives in a [`ConversationCache`] behind
//! a mutex that is never held across an await point. Every mutation bumps a
//! revision counter that UIs can [`subscribe`](ConversationReconciler::subscribe) to.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backend::BackendClient;
use crate::cache::ConversationCache;
use crate::error::{ChatError, ChatResult};
use crate::history::records_to_messages;
use crate::models::{
    derive_title, ChatRequest, Conversation, Message, SendOptions, MAX_CONTENT_CHARS,
};
use crate::session::SessionEvent;
use crate::traits::ConversationPersistence;

/// Reply text shown when neither the stream nor the fallback produced one.
pub const FAILURE_MESSAGE: &str = "Sorry, the message failed to send. Please try again.";

/// How the reply of a successful send was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Streamed,
    /// The stream failed and the non-streaming endpoint answered.
    Fallback,
    /// The caller cancelled the stream or the fallback request.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    /// Local id of the conversation the exchange was recorded in, after any
    /// promotion.
    pub conversation_id: String,
    pub delivery: Delivery,
}

enum StreamOutcome {
    Completed,
    Cancelled,
    Failed(ChatError),
}

/// Handle to the conversation collection. Clones share state.
#[derive(Clone)]
pub struct ConversationReconciler {
    cache: Arc<Mutex<ConversationCache>>,
    backend: Arc<BackendClient>,
    persistence: Arc<dyn ConversationPersistence>,
    revision: Arc<watch::Sender<u64>>,
}

impl std::fmt::Debug for ConversationReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationReconciler")
            .field("backend", &self.backend)
            .field("revision", &*self.revision.borrow())
            .finish_non_exhaustive()
    }
}

impl ConversationReconciler {
    /// Reconciler persisting through the backend itself.
    pub fn new(backend: BackendClient) -> Self {
        let backend = Arc::new(backend);
        let persistence: Arc<dyn ConversationPersistence> = backend.clone();
        let (revision, _) = watch::channel(0);
        Self {
            cache: Arc::new(Mutex::new(ConversationCache::new())),
            backend,
            persistence,
            revision: Arc::new(revision),
        }
    }

    /// Use a different persistence collaborator.
    pub fn with_persistence(mut self, persistence: Arc<dyn ConversationPersistence>) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    fn lock(&self) -> MutexGuard<'_, ConversationCache> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Revision counter, bumped after every state change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn current_conversation(&self) -> Option<Conversation> {
        self.lock().current().cloned()
    }

    pub fn current_messages(&self) -> Vec<Message> {
        self.lock().current_messages().to_vec()
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.lock().conversations().into_iter().cloned().collect()
    }

    pub fn conversation(&self, id: &str) -> Option<Conversation> {
        self.lock().get(id).cloned()
    }

    pub fn is_streaming(&self, id: &str) -> bool {
        self.lock().is_streaming(id)
    }

    pub fn toggle_expanded(&self, conversation_id: &str, message_id: &str) -> bool {
        let toggled = self.lock().toggle_expanded(conversation_id, message_id);
        if toggled {
            self.bump();
        }
        toggled
    }

    /// Return the draft conversation, creating it if needed, and select it.
    pub fn create_draft(&self) -> Conversation {
        let draft = {
            let mut cache = self.lock();
            let id = cache.create_draft();
            cache.get(&id).cloned()
        };
        self.bump();
        draft.unwrap_or_else(Conversation::draft)
    }

    /// Send a message into the current conversation and record the reply.
    ///
    /// A draft is promoted first; promotion failure is logged and the send
    /// continues locally. If the stream fails, one non-streaming request is
    /// made. If that fails too, the reply reads [`FAILURE_MESSAGE`] and the
    /// stream error is returned.
    pub async fn send_message(
        &self,
        content: &str,
        options: SendOptions,
    ) -> ChatResult<SendOutcome> {
        validate_content(content)?;

        let token = CancellationToken::new();
        let (mut conversation_id, is_draft) = {
            let mut cache = self.lock();
            let id = match cache.current_id() {
                Some(id) => id.to_string(),
                None => cache.create_draft(),
            };
            cache.begin_stream(&id, token.clone())?;
            let is_draft = cache.get(&id).map_or(false, Conversation::is_draft);
            (id, is_draft)
        };
        self.bump();

        let user_id = options
            .user_id
            .clone()
            .unwrap_or_else(|| self.backend.config().user_id.clone());
        if is_draft {
            conversation_id = self.promote(&conversation_id, content, &user_id).await;
        }

        let pushed = self.lock().push_user_message(&conversation_id, content);
        if pushed.is_none() {
            // Deleted while the promotion was in flight.
            debug!(conversation_id = %conversation_id, "Conversation gone before send");
            self.lock().end_stream(&conversation_id);
            return Err(ChatError::Cancelled);
        }
        self.bump();

        let wire_id = options
            .conversation_id
            .clone()
            .unwrap_or_else(|| conversation_id.clone());
        let request = ChatRequest::new(content, wire_id, user_id).with_options(&options);

        let result = match self
            .run_stream(&conversation_id, &request, token.clone())
            .await
        {
            StreamOutcome::Completed => {
                self.lock().complete_exchange(&conversation_id);
                Ok(Delivery::Streamed)
            }
            StreamOutcome::Cancelled => {
                self.lock().cancel_streaming_message(&conversation_id);
                info!(conversation_id = %conversation_id, "Stream cancelled");
                Ok(Delivery::Cancelled)
            }
            StreamOutcome::Failed(stream_err) => {
                warn!(
                    conversation_id = %conversation_id,
                    error = %stream_err,
                    "Stream failed, trying non-streaming request"
                );
                self.fallback(&conversation_id, &request, stream_err, &token)
                    .await
            }
        };

        self.lock().end_stream(&conversation_id);
        self.bump();
        result.map(|delivery| SendOutcome {
            conversation_id,
            delivery,
        })
    }

    /// Promote a draft under a title derived from `content`, owned by the
    /// same user the chat request is sent as. Returns the id to keep writing
    /// into.
    async fn promote(&self, draft_id: &str, content: &str, user_id: &str) -> String {
        let title = derive_title(content);
        debug!(draft_id, user_id, title = %title, "Promoting draft conversation");

        match self.persistence.create_conversation(user_id, &title).await {
            Ok(record) => {
                let promoted = self.lock().promote_draft(draft_id, record);
                self.bump();
                promoted.unwrap_or_else(|| draft_id.to_string())
            }
            Err(e) => {
                warn!(draft_id, error = %e, "Could not save conversation, continuing locally");
                draft_id.to_string()
            }
        }
    }

    async fn run_stream(
        &self,
        conversation_id: &str,
        request: &ChatRequest,
        token: CancellationToken,
    ) -> StreamOutcome {
        let mut session = match self.backend.open_session(request, token).await {
            Ok(session) => session,
            Err(ChatError::Cancelled) => return StreamOutcome::Cancelled,
            Err(e) => return StreamOutcome::Failed(e),
        };

        while let Some(event) = session.next_event().await {
            match event {
                SessionEvent::Event(event) => {
                    let changed = self.lock().apply_event(conversation_id, &event);
                    if changed {
                        self.bump();
                    }
                }
                SessionEvent::Completed => return StreamOutcome::Completed,
                SessionEvent::Failed(e) => return StreamOutcome::Failed(e),
            }
        }
        StreamOutcome::Cancelled
    }

    async fn fallback(
        &self,
        conversation_id: &str,
        request: &ChatRequest,
        stream_err: ChatError,
        cancel: &CancellationToken,
    ) -> ChatResult<Delivery> {
        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.lock().cancel_streaming_message(conversation_id);
                info!(conversation_id, "Cancelled during non-streaming request");
                return Ok(Delivery::Cancelled);
            }
            reply = self.backend.send_chat(request) => reply,
        };

        match reply {
            Ok(reply) => {
                self.lock()
                    .apply_reply(conversation_id, reply.text(), reply.sources.clone());
                info!(conversation_id, "Reply delivered by non-streaming request");
                Ok(Delivery::Fallback)
            }
            Err(fallback_err) => {
                error!(
                    conversation_id,
                    error = %fallback_err,
                    "Non-streaming request failed too"
                );
                self.lock().apply_failure(conversation_id, FAILURE_MESSAGE);
                Err(stream_err)
            }
        }
    }

    /// Make `id` the current conversation. A persisted conversation always
    /// reloads its timeline from the backend; a draft shows its local one.
    pub async fn select_conversation(&self, id: &str) -> ChatResult<()> {
        let target = {
            let mut cache = self.lock();
            if !cache.select(id) {
                return Err(ChatError::InvalidArgument(format!(
                    "unknown conversation {id}"
                )));
            }
            cache.current().map(|c| (c.id.clone(), c.is_draft()))
        };
        self.bump();

        let Some((resolved, false)) = target else {
            return Ok(());
        };

        match self.persistence.conversation_history(&resolved).await {
            Ok(records) => {
                let messages = records_to_messages(records);
                debug!(conversation_id = %resolved, count = messages.len(), "Timeline loaded");
                self.lock().load_timeline(&resolved, messages);
                self.bump();
                Ok(())
            }
            Err(e) => {
                warn!(conversation_id = %resolved, error = %e, "Could not load timeline");
                self.lock().load_timeline(&resolved, Vec::new());
                self.bump();
                Err(e)
            }
        }
    }

    /// Remove a conversation locally, then ask the backend to delete it.
    ///
    /// The local removal stands even when the backend call fails; the error is
    /// still returned. Drafts never reach the backend.
    pub async fn delete_conversation(&self, id: &str) -> ChatResult<()> {
        let removed = {
            let mut cache = self.lock();
            let target = cache.get(id).map(|c| (c.id.clone(), c.is_draft()));
            cache.remove(id);
            target
        };
        self.bump();

        match removed {
            Some((_, true)) => Ok(()),
            Some((resolved, false)) => self.delete_remote(&resolved).await,
            None => self.delete_remote(id).await,
        }
    }

    async fn delete_remote(&self, id: &str) -> ChatResult<()> {
        self.persistence
            .delete_conversation(id)
            .await
            .map_err(|e| {
                warn!(conversation_id = id, error = %e, "Backend delete failed, kept local removal");
                e
            })
    }

    /// Replace the persisted conversations with the backend listing. On
    /// failure the persisted list is left empty. Returns the number loaded.
    pub async fn load_conversations(&self) -> ChatResult<usize> {
        let user_id = self.backend.config().user_id.clone();
        let result = self.persistence.list_conversations(&user_id).await;

        let outcome = match result {
            Ok(records) => {
                let count = records.len();
                self.lock().replace_persisted(records);
                info!(count, "Conversations loaded");
                Ok(count)
            }
            Err(e) => {
                warn!(error = %e, "Could not load conversations");
                self.lock().replace_persisted(Vec::new());
                Err(e)
            }
        };
        self.bump();
        outcome
    }

    /// Rename a conversation. The local title changes only once the backend
    /// accepted it; a draft is renamed locally.
    pub async fn rename_conversation(&self, id: &str, title: &str) -> ChatResult<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ChatError::InvalidArgument("title is empty".to_string()));
        }
        let target = self.lock().get(id).map(|c| (c.id.clone(), c.is_draft()));
        let Some((resolved, is_draft)) = target else {
            return Err(ChatError::InvalidArgument(format!(
                "unknown conversation {id}"
            )));
        };

        if !is_draft {
            self.persistence.rename_conversation(&resolved, title).await?;
        }
        self.lock().set_title(&resolved, title);
        self.bump();
        Ok(())
    }

    /// Cancel the active stream of a conversation. The reply keeps what
    /// already arrived, marked as cancelled. Returns false if nothing was
    /// streaming.
    pub fn cancel_stream(&self, id: &str) -> bool {
        let token = self.lock().stream_token(id);
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

fn validate_content(content: &str) -> ChatResult<()> {
    if content.trim().is_empty() {
        return Err(ChatError::InvalidArgument(
            "message content is empty".to_string(),
        ));
    }
    let chars = content.chars().count();
    if chars > MAX_CONTENT_CHARS {
        return Err(ChatError::InvalidArgument(format!(
            "message content is {chars} characters, limit is {MAX_CONTENT_CHARS}"
        )));
    }
    Ok(())
}
