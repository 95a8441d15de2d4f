use serde::{Deserialize, Serialize};

/// Longest message the backend accepts, in characters.
pub const MAX_CONTENT_CHARS: usize = 10_000;

/// Reply text used when the non-streaming endpoint answers without content.
pub const DEFAULT_REPLY: &str = "Reply received";

/// Body of both the streaming and the non-streaming chat endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub content: String,
    pub conversation_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_library: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retrieval_docs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl ChatRequest {
    pub fn new(
        content: impl Into<String>,
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            conversation_id: conversation_id.into(),
            user_id: user_id.into(),
            retrieval_mode: None,
            selected_library: None,
            collection_id: None,
            max_retrieval_docs: None,
            system_prompt: None,
        }
    }

    /// Copy the optional retrieval settings from caller options.
    pub fn with_options(mut self, options: &SendOptions) -> Self {
        self.retrieval_mode = options.retrieval_mode.clone();
        self.selected_library = options.selected_library.clone();
        self.collection_id = options.collection_id.clone();
        self.max_retrieval_docs = options.max_retrieval_docs;
        self.system_prompt = options.system_prompt.clone();
        self
    }
}

/// Per-send options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendOptions {
    /// Conversation id sent to the backend instead of the current one's. The
    /// local timeline of the current conversation still records the exchange.
    pub conversation_id: Option<String>,
    /// Overrides the configured user id.
    pub user_id: Option<String>,
    pub retrieval_mode: Option<String>,
    pub selected_library: Option<String>,
    pub collection_id: Option<String>,
    pub max_retrieval_docs: Option<u32>,
    pub system_prompt: Option<String>,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_retrieval_mode(mut self, mode: impl Into<String>) -> Self {
        self.retrieval_mode = Some(mode.into());
        self
    }

    pub fn with_selected_library(mut self, library: impl Into<String>) -> Self {
        self.selected_library = Some(library.into());
        self
    }

    pub fn with_collection_id(mut self, collection_id: impl Into<String>) -> Self {
        self.collection_id = Some(collection_id.into());
        self
    }

    pub fn with_max_retrieval_docs(mut self, max: u32) -> Self {
        self.max_retrieval_docs = Some(max);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Answer of the non-streaming chat endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<serde_json::Value>>,
}

impl ChatReply {
    /// `content`, else `message`, else [`DEFAULT_REPLY`]. Empty strings count
    /// as missing.
    pub fn text(&self) -> &str {
        self.content
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.message.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or(DEFAULT_REPLY)
    }
}
