//! Fixed credential providers.

use async_trait::async_trait;

use crate::traits::{CredentialsError, CredentialsProvider};

/// Sends every request without an `Authorization` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

#[async_trait]
impl CredentialsProvider for NoCredentials {
    async fn authorization(&self) -> Result<Option<String>, CredentialsError> {
        Ok(None)
    }
}

/// Sends the same header value with every request.
#[derive(Clone)]
pub struct StaticCredentials {
    value: String,
}

impl StaticCredentials {
    /// Header value `Bearer <token>`.
    pub fn bearer(token: impl AsRef<str>) -> Self {
        Self {
            value: format!("Bearer {}", token.as_ref()),
        }
    }

    /// Header value used verbatim.
    pub fn raw(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("value", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl CredentialsProvider for StaticCredentials {
    async fn authorization(&self) -> Result<Option<String>, CredentialsError> {
        Ok(Some(self.value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bearer() {
        let creds = StaticCredentials::bearer("t0k");
        assert_eq!(creds.authorization().await.unwrap().as_deref(), Some("Bearer t0k"));
        assert!(!format!("{creds:?}").contains("t0k"));
    }

    #[tokio::test]
    async fn test_none() {
        assert_eq!(NoCredentials.authorization().await.unwrap(), None);
    }
}
