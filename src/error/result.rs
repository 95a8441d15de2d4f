//! Result alias for chat core operations.

use super::chat_error::ChatError;

pub type ChatResult<T> = Result<T, ChatError>;

/// Converts any displayable error into a [`ChatError::Persistence`].
pub trait PersistenceResultExt<T> {
    fn persistence(self, operation: &str) -> ChatResult<T>;
}

impl<T, E: std::fmt::Display> PersistenceResultExt<T> for Result<T, E> {
    fn persistence(self, operation: &str) -> ChatResult<T> {
        self.map_err(|e| ChatError::persistence(operation, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_ext_wraps_message() {
        let failed: Result<(), String> = Err("disk full".to_string());
        let err = failed.persistence("create conversation").unwrap_err();
        assert_eq!(err.to_string(), "create conversation failed: disk full");
    }
}
