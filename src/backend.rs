//! Backend API client.
//!
//! Builds every request the chat core sends: the streaming chat call, the
//! one-shot fallback, and the conversation/history calls behind
//! [`ConversationPersistence`]. Each call is bounded by
//! [`ClientConfig::request_timeout`].

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::adapters::{NoCredentials, ReqwestHttpClient};
use crate::config::ClientConfig;
use crate::error::{ChatError, ChatResult, PersistenceResultExt};
use crate::history::{normalize_payload, parse_records, HistoryRecord, PayloadError};
use crate::models::{ChatReply, ChatRequest, ConversationRecord};
use crate::session::{StreamRequest, StreamSession};
use crate::traits::{
    ConversationPersistence, CredentialsProvider, Headers, HttpClient, HttpError, Response,
};

pub const CHAT_STREAM_PATH: &str = "/api/llm/chat/stream";
pub const CHAT_PATH: &str = "/api/llm/chat";
pub const CONVERSATION_PATH: &str = "/api/llm/conversation";
pub const HISTORY_PATH: &str = "/api/llm/history";

impl From<PayloadError> for ChatError {
    fn from(err: PayloadError) -> Self {
        match err.status {
            Some(status) => ChatError::Transport(HttpError::ServerError {
                status,
                message: err.message,
            }),
            None => ChatError::protocol(err.message),
        }
    }
}

/// Client for the chat backend.
///
/// Cheap to clone; the transport and credential provider are shared.
#[derive(Clone)]
pub struct BackendClient {
    http: Arc<dyn HttpClient>,
    credentials: Arc<dyn CredentialsProvider>,
    config: ClientConfig,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        credentials: Arc<dyn CredentialsProvider>,
        config: ClientConfig,
    ) -> Self {
        Self {
            http,
            credentials,
            config,
        }
    }

    /// Production client over reqwest, without credentials.
    pub fn with_reqwest(config: ClientConfig) -> ChatResult<Self> {
        let http = ReqwestHttpClient::from_config(&config)?;
        Ok(Self::new(Arc::new(http), Arc::new(NoCredentials), config))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn http(&self) -> Arc<dyn HttpClient> {
        Arc::clone(&self.http)
    }

    async fn headers(&self) -> ChatResult<Headers> {
        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        if let Some(value) = self.credentials.authorization().await? {
            headers.insert("Authorization".to_string(), value);
        }
        Ok(headers)
    }

    /// Run a transport call under the request ceiling.
    async fn with_timeout<T, F>(&self, operation: &str, fut: F) -> ChatResult<T>
    where
        F: Future<Output = Result<T, HttpError>>,
    {
        let ceiling = self.config.request_timeout;
        match tokio::time::timeout(ceiling, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ChatError::from_transport(e, operation, ceiling)),
            Err(_elapsed) => Err(ChatError::timeout(operation, ceiling)),
        }
    }

    /// Status check, JSON decode and envelope normalization.
    fn read_payload(response: Response) -> ChatResult<serde_json::Value> {
        if !response.is_success() {
            return Err(ChatError::Transport(HttpError::ServerError {
                status: response.status,
                message: response.text_lossy(),
            }));
        }
        if response.body.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        let body: serde_json::Value = response.json()?;
        Ok(normalize_payload(body)?)
    }

    /// Issue one buffered call and return its normalized payload.
    async fn call(
        &self,
        operation: &str,
        method: Method,
        path: &str,
    ) -> ChatResult<serde_json::Value> {
        let headers = self.headers().await?;
        let url = self.config.url(path);
        let response = match method {
            Method::Get => self.with_timeout(operation, self.http.get(&url, &headers)).await?,
            Method::Post(body) => {
                self.with_timeout(operation, self.http.post(&url, &body, &headers))
                    .await?
            }
            Method::Put(body) => {
                self.with_timeout(operation, self.http.put(&url, &body, &headers))
                    .await?
            }
            Method::Delete => {
                self.with_timeout(operation, self.http.delete(&url, &headers))
                    .await?
            }
        };
        Self::read_payload(response)
    }

    /// Serialize a chat request into a ready-to-send streaming request.
    pub async fn prepare_stream(&self, request: &ChatRequest) -> ChatResult<StreamRequest> {
        let mut headers = self.headers().await?;
        headers.insert("Accept".to_string(), "text/event-stream".to_string());
        Ok(StreamRequest {
            url: self.config.url(CHAT_STREAM_PATH),
            body: serde_json::to_string(request)?,
            headers,
        })
    }

    /// Open a streaming session for `request`, observing `cancel`.
    pub async fn open_session(
        &self,
        request: &ChatRequest,
        cancel: CancellationToken,
    ) -> ChatResult<StreamSession> {
        let prepared = self.prepare_stream(request).await?;
        let mut session = StreamSession::new(self.http(), self.config.request_timeout)
            .with_cancellation(cancel);
        session.start(&prepared).await?;
        Ok(session)
    }

    /// One-shot, non-streaming chat call with the same payload.
    pub async fn send_chat(&self, request: &ChatRequest) -> ChatResult<ChatReply> {
        debug!(conversation_id = %request.conversation_id, "Sending non-streaming chat request");
        let body = serde_json::to_string(request)?;
        let payload = self.call("send chat", Method::Post(body), CHAT_PATH).await?;
        let reply = match payload {
            serde_json::Value::String(text) => ChatReply {
                content: Some(text),
                ..ChatReply::default()
            },
            serde_json::Value::Null => ChatReply::default(),
            other => serde_json::from_value(other).unwrap_or_else(|e| {
                warn!(error = %e, "Unreadable chat reply, using default text");
                ChatReply::default()
            }),
        };
        Ok(reply)
    }
}

enum Method {
    Get,
    Post(String),
    Put(String),
    Delete,
}

fn decode<T: serde::de::DeserializeOwned>(payload: serde_json::Value) -> ChatResult<T> {
    Ok(serde_json::from_value(payload)?)
}

#[async_trait]
impl ConversationPersistence for BackendClient {
    async fn create_conversation(
        &self,
        user_id: &str,
        title: &str,
    ) -> ChatResult<ConversationRecord> {
        const OPERATION: &str = "create conversation";
        let body = serde_json::json!({ "user_id": user_id, "title": title }).to_string();
        self.call(OPERATION, Method::Post(body), CONVERSATION_PATH)
            .await
            .and_then(decode)
            .persistence(OPERATION)
    }

    async fn delete_conversation(&self, conversation_id: &str) -> ChatResult<()> {
        const OPERATION: &str = "delete conversation";
        let path = format!("{CONVERSATION_PATH}/{conversation_id}");
        self.call(OPERATION, Method::Delete, &path)
            .await
            .map(|_| ())
            .persistence(OPERATION)
    }

    async fn rename_conversation(&self, conversation_id: &str, title: &str) -> ChatResult<()> {
        const OPERATION: &str = "rename conversation";
        let body = serde_json::json!({ "title": title }).to_string();
        let path = format!("{CONVERSATION_PATH}/{conversation_id}/title");
        self.call(OPERATION, Method::Put(body), &path)
            .await
            .map(|_| ())
            .persistence(OPERATION)
    }

    async fn list_conversations(&self, user_id: &str) -> ChatResult<Vec<ConversationRecord>> {
        const OPERATION: &str = "list conversations";
        let path = format!("{HISTORY_PATH}/{user_id}");
        let payload = self
            .call(OPERATION, Method::Get, &path)
            .await
            .persistence(OPERATION)?;
        let serde_json::Value::Array(items) = payload else {
            return Ok(Vec::new());
        };
        Ok(items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable conversation record");
                    None
                }
            })
            .collect())
    }

    async fn conversation_history(&self, conversation_id: &str) -> ChatResult<Vec<HistoryRecord>> {
        const OPERATION: &str = "load conversation history";
        let path = format!("{HISTORY_PATH}/single/{conversation_id}");
        self.call(OPERATION, Method::Get, &path)
            .await
            .map(parse_records)
            .persistence(OPERATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{InMemoryCredentials, MockHttpClient, MockResponse};
    use crate::session::SessionState;
    use serde_json::json;
    use std::time::Duration;

    const BASE: &str = "http://backend.test";

    fn client(mock: &MockHttpClient) -> BackendClient {
        BackendClient::new(
            Arc::new(mock.clone()),
            Arc::new(InMemoryCredentials::with_token("secret")),
            ClientConfig::default().with_base_url(BASE),
        )
    }

    fn request() -> ChatRequest {
        ChatRequest::new("hi", "c1", "default_user")
    }

    #[tokio::test]
    async fn test_prepare_stream_sets_url_body_and_auth() {
        let mock = MockHttpClient::new();
        let prepared = client(&mock).prepare_stream(&request()).await.unwrap();
        assert_eq!(prepared.url, "http://backend.test/api/llm/chat/stream");
        assert_eq!(
            prepared.headers.get("Authorization").map(String::as_str),
            Some("Bearer secret")
        );
        let body: serde_json::Value = serde_json::from_str(&prepared.body).unwrap();
        assert_eq!(body["conversation_id"], "c1");
        assert!(body.get("system_prompt").is_none());
    }

    #[tokio::test]
    async fn test_credentials_failure_blocks_request() {
        let mock = MockHttpClient::new();
        let credentials = InMemoryCredentials::new();
        credentials.set_should_fail(true);
        let client = BackendClient::new(
            Arc::new(mock.clone()),
            Arc::new(credentials),
            ClientConfig::default().with_base_url(BASE),
        );
        assert!(client.send_chat(&request()).await.is_err());
        assert!(mock.get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_open_session_streams() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://backend.test/api/llm/chat/stream",
            MockResponse::chunks(["data: {\"type\":\"token\",\"content\":\"x\"}\n"]),
        );
        let session = client(&mock)
            .open_session(&request(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(session.state(), SessionState::Streaming);
    }

    #[tokio::test]
    async fn test_send_chat_reads_enveloped_content() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://backend.test/api/llm/chat",
            MockResponse::json(json!({"status": 200, "data": {"content": "pong"}, "msg": "ok"})),
        );
        let reply = client(&mock).send_chat(&request()).await.unwrap();
        assert_eq!(reply.text(), "pong");
    }

    #[tokio::test]
    async fn test_send_chat_defaults_reply_text() {
        let mock = MockHttpClient::new();
        mock.set_response("http://backend.test/api/llm/chat", MockResponse::json(json!({})));
        let reply = client(&mock).send_chat(&request()).await.unwrap();
        assert_eq!(reply.text(), "Reply received");
    }

    #[tokio::test]
    async fn test_send_chat_server_error() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://backend.test/api/llm/chat",
            MockResponse::Success(Response::new(503, "unavailable")),
        );
        let err = client(&mock).send_chat(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            ChatError::Transport(HttpError::ServerError { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_send_chat_timeout() {
        let mock = MockHttpClient::new();
        mock.set_response("http://backend.test/api/llm/chat", MockResponse::Hang);
        let client = BackendClient::new(
            Arc::new(mock),
            Arc::new(NoCredentials),
            ClientConfig::default()
                .with_base_url(BASE)
                .with_request_timeout(Duration::from_millis(20)),
        );
        let err = client.send_chat(&request()).await.unwrap_err();
        assert!(matches!(err, ChatError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_create_conversation() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://backend.test/api/llm/conversation",
            MockResponse::json(json!({
                "status": 200,
                "data": {"conversation_id": 42, "title": "hello", "created_at": "2024-05-01T10:00:00"},
                "msg": "created"
            })),
        );
        let record = client(&mock)
            .create_conversation("default_user", "hello")
            .await
            .unwrap();
        assert_eq!(record.conversation_id, "42");
        let sent = mock.requests_to("/api/llm/conversation");
        assert_eq!(sent[0].json_body(), json!({"user_id": "default_user", "title": "hello"}));
    }

    #[tokio::test]
    async fn test_persistence_failures_are_persistence_errors() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://backend.test/api/llm/conversation/c9",
            MockResponse::json(json!({"status": 404, "data": null, "msg": "not found"})),
        );
        let err = client(&mock).delete_conversation("c9").await.unwrap_err();
        assert!(matches!(err, ChatError::Persistence { .. }));
        assert!(err.to_string().starts_with("delete conversation failed"));
    }

    #[tokio::test]
    async fn test_rename_uses_put() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://backend.test/api/llm/conversation/c1/title",
            MockResponse::json(json!({"status": 200, "data": {"success": true}, "msg": "ok"})),
        );
        client(&mock).rename_conversation("c1", "Renamed").await.unwrap();
        let sent = mock.get_requests();
        assert_eq!(sent[0].method, "PUT");
        assert_eq!(sent[0].json_body(), json!({"title": "Renamed"}));
    }

    #[tokio::test]
    async fn test_list_conversations_unwraps_and_skips_bad_records() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://backend.test/api/llm/history/default_user",
            MockResponse::json(json!({
                "status": 200,
                "data": {"success": true, "conversations": [
                    {"conversation_id": "a", "title": "First"},
                    {"title": "no id"},
                    {"conversation_id": 7, "title": null}
                ]},
                "msg": "ok"
            })),
        );
        let records = client(&mock).list_conversations("default_user").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].conversation_id, "7");
        assert_eq!(records[1].title, "");
    }

    #[tokio::test]
    async fn test_history_non_array_is_empty() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://backend.test/api/llm/history/single/c1",
            MockResponse::json(json!({"status": 200, "data": {"unexpected": 1}, "msg": "ok"})),
        );
        let records = client(&mock).conversation_history("c1").await.unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_payload_error_mapping() {
        let with_status: ChatError = PayloadError {
            status: Some(500),
            message: "db".to_string(),
        }
        .into();
        assert!(matches!(with_status, ChatError::Transport(_)));
        let without: ChatError = PayloadError {
            status: None,
            message: "nope".to_string(),
        }
        .into();
        assert_eq!(without, ChatError::protocol("nope"));
    }
}
