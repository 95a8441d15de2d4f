//! Credential collaborator seam.
//!
//! The core never stores or inspects credentials. It asks a provider for the
//! value of the `Authorization` header right before each outbound call.

use async_trait::async_trait;

/// Credential lookup failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsError {
    /// The provider could not produce a value.
    Unavailable(String),
    Other(String),
}

impl std::fmt::Display for CredentialsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialsError::Unavailable(msg) => write!(f, "Credentials unavailable: {}", msg),
            CredentialsError::Other(msg) => write!(f, "Credentials error: {}", msg),
        }
    }
}

impl std::error::Error for CredentialsError {}

/// Supplies the authorization header for outbound requests.
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    /// Returns the full header value (e.g. `Bearer abc`), or `None` to send
    /// the request unauthenticated.
    async fn authorization(&self) -> Result<Option<String>, CredentialsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_error_display() {
        assert_eq!(
            CredentialsError::Unavailable("locked".to_string()).to_string(),
            "Credentials unavailable: locked"
        );
        assert_eq!(
            CredentialsError::Other("x".to_string()).to_string(),
            "Credentials error: x"
        );
    }
}
