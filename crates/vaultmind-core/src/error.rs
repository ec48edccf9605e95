//! Error types for vaultmind.

use thiserror::Error;

/// Result type alias using vaultmind's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for vaultmind operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Vault name does not resolve to a configured vault
    #[error("Vault not found: {0}")]
    VaultNotFound(String),

    /// Caller's request is malformed
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Embeddings provider refused an input as too long
    #[error("Input too long for embedding model: {0}")]
    OversizeInput(String),

    /// Chat/generation failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Vector store operation failed
    #[error("Vector store error: {0}")]
    VectorStore(String),

    /// An indexing run is already in progress
    #[error("Indexing busy: {0}")]
    Busy(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors caused by the caller's request rather than the system.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::VaultNotFound(_))
    }

    /// True for failures of an upstream collaborator (embeddings, chat,
    /// vector store). These are surfaced as "upstream unavailable" and are
    /// retryable by the caller.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::Embedding(_)
                | Error::Inference(_)
                | Error::VectorStore(_)
                | Error::Request(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_validation() {
        let err = Error::Validation("question must not be empty".to_string());
        assert_eq!(err.to_string(), "Invalid input: question must not be empty");
    }

    #[test]
    fn test_error_display_vault_not_found() {
        let err = Error::VaultNotFound("does-not-exist".to_string());
        assert_eq!(err.to_string(), "Vault not found: does-not-exist");
    }

    #[test]
    fn test_error_display_oversize() {
        let err = Error::OversizeInput("chunk of 40000 chars".to_string());
        assert!(err.to_string().contains("too long"));
    }

    #[test]
    fn test_error_display_busy() {
        let err = Error::Busy("index_all already running".to_string());
        assert_eq!(err.to_string(), "Indexing busy: index_all already running");
    }

    #[test]
    fn test_validation_classification() {
        assert!(Error::Validation("x".into()).is_validation());
        assert!(Error::VaultNotFound("x".into()).is_validation());
        assert!(!Error::Embedding("x".into()).is_validation());
        assert!(!Error::Busy("x".into()).is_validation());
    }

    #[test]
    fn test_upstream_classification() {
        assert!(Error::Embedding("x".into()).is_upstream());
        assert!(Error::Inference("x".into()).is_upstream());
        assert!(Error::VectorStore("x".into()).is_upstream());
        assert!(!Error::Validation("x".into()).is_upstream());
        assert!(!Error::OversizeInput("x".into()).is_upstream());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
