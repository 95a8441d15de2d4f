//! Common test utilities for integration tests.
//!
//! Builds reconcilers over a [`MockHttpClient`] pointed at a fake base URL,
//! plus helpers for writing stream lines.
//!
//! # Example
//!
//! ```ignore
//! let harness = TestHarness::new();
//! harness.stream(&[token_line("Hi", false), token_line("Hi", true)]);
//! harness.chat.send_message("hello", SendOptions::default()).await?;
//! ```

#![allow(dead_code)]

pub mod mocks;

pub use mocks::*;

use std::sync::Arc;
use std::time::Duration;

use ragchat::adapters::mock::{InMemoryCredentials, MockHttpClient};
use ragchat::{BackendClient, ClientConfig, ConversationReconciler};

pub const BASE_URL: &str = "http://chat.test";

/// Absolute URL of a backend path on the fake host.
pub fn url(path: &str) -> String {
    format!("{BASE_URL}{path}")
}

pub fn test_config() -> ClientConfig {
    ClientConfig::default()
        .with_base_url(BASE_URL)
        .with_request_timeout(Duration::from_secs(2))
}

/// A reconciler wired to a mock transport.
pub struct TestHarness {
    pub http: MockHttpClient,
    pub credentials: InMemoryCredentials,
    pub chat: ConversationReconciler,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let http = MockHttpClient::new();
        let credentials = InMemoryCredentials::with_token("test-token");
        let backend = BackendClient::new(
            Arc::new(http.clone()),
            Arc::new(credentials.clone()),
            config,
        );
        Self {
            http,
            credentials,
            chat: ConversationReconciler::new(backend),
        }
    }

    /// Answer the streaming endpoint with one chunk per line.
    pub fn stream(&self, lines: &[String]) {
        self.http.set_response(
            &url(CHAT_STREAM),
            MockResponse::chunks(lines.iter().map(|l| format!("{l}\n"))),
        );
    }

    /// Answer draft promotion with the given backend id.
    pub fn accept_create(&self, conversation_id: &str) {
        self.http.set_response(
            &url(CONVERSATION),
            MockResponse::json(envelope(serde_json::json!({
                "conversation_id": conversation_id,
                "title": "ignored",
                "created_at": "2024-05-01T10:00:00",
                "updated_at": "2024-05-01T10:00:00"
            }))),
        );
    }

    /// Methods and URLs of all requests, in order.
    pub fn request_log(&self) -> Vec<(String, String)> {
        self.http
            .get_requests()
            .into_iter()
            .map(|r| (r.method, r.url))
            .collect()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
