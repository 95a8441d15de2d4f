//! In-memory credentials provider for testing.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::traits::{CredentialsError, CredentialsProvider};

/// Credentials provider whose header value and failure mode tests can change
/// at any time.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentials {
    authorization: Arc<Mutex<Option<String>>>,
    should_fail: Arc<Mutex<bool>>,
    lookups: Arc<Mutex<usize>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl InMemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider answering with `Bearer <token>`.
    pub fn with_token(token: &str) -> Self {
        let provider = Self::new();
        provider.set_authorization(Some(format!("Bearer {token}")));
        provider
    }

    pub fn set_authorization(&self, value: Option<String>) {
        *lock(&self.authorization) = value;
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        *lock(&self.should_fail) = should_fail;
    }

    /// How many times the header was requested.
    pub fn lookups(&self) -> usize {
        *lock(&self.lookups)
    }
}

#[async_trait]
impl CredentialsProvider for InMemoryCredentials {
    async fn authorization(&self) -> Result<Option<String>, CredentialsError> {
        *lock(&self.lookups) += 1;
        if *lock(&self.should_fail) {
            return Err(CredentialsError::Unavailable(
                "Mock credentials failure".to_string(),
            ));
        }
        Ok(lock(&self.authorization).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_and_failure() {
        let provider = InMemoryCredentials::with_token("abc");
        assert_eq!(
            provider.authorization().await.unwrap().as_deref(),
            Some("Bearer abc")
        );

        provider.set_should_fail(true);
        assert!(provider.authorization().await.is_err());
        assert_eq!(provider.lookups(), 2);
    }

    #[tokio::test]
    async fn test_empty_provider() {
        let provider = InMemoryCredentials::new();
        assert_eq!(provider.authorization().await.unwrap(), None);
    }
}
