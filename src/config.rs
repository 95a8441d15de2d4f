//! Client configuration.
//!
//! Passed explicitly into [`BackendClient`](crate::backend::BackendClient); the
//! crate keeps no global base URL or credential state.

use std::time::Duration;

use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_USER_ID: &str = "default_user";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable overriding [`ClientConfig::base_url`].
pub const ENV_BASE_URL: &str = "RAGCHAT_BASE_URL";
/// Environment variable overriding [`ClientConfig::user_id`].
pub const ENV_USER_ID: &str = "RAGCHAT_USER_ID";
/// Environment variable overriding [`ClientConfig::request_timeout`], in seconds.
pub const ENV_TIMEOUT_SECS: &str = "RAGCHAT_TIMEOUT_SECS";

/// Connection settings for the chat backend.
///
/// # Example
///
/// ```ignore
/// use ragchat::config::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_base_url("https://chat.example.com")
///     .with_request_timeout(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend root, without a trailing slash.
    pub base_url: String,
    /// Sent as `user_id` in chat and create requests.
    pub user_id: String,
    /// Ceiling for opening a request and for each wait on the next stream chunk.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Defaults overridden by `RAGCHAT_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            if !url.trim().is_empty() {
                config = config.with_base_url(url.trim());
            }
        }

        if let Ok(user_id) = std::env::var(ENV_USER_ID) {
            if !user_id.trim().is_empty() {
                config = config.with_user_id(user_id.trim());
            }
        }

        if let Ok(raw) = std::env::var(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => {
                    config = config.with_request_timeout(Duration::from_secs(secs));
                }
                _ => warn!(value = %raw, "Ignoring invalid {}", ENV_TIMEOUT_SECS),
            }
        }

        config
    }

    /// Absolute URL of a backend path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
