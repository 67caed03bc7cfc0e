//! Error types for the knowledge base and answering pipeline

use std::time::Duration;
use thiserror::Error;

/// Result type alias for kb-rag operations
pub type Result<T> = std::result::Result<T, Error>;

/// kb-rag errors
#[derive(Debug, Error)]
pub enum Error {
    /// Empty or whitespace-only input to a user-facing operation
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Knowledge store failure (storage unavailable, dimension mismatch, ...)
    #[error("Knowledge store error: {0}")]
    Store(String),

    /// A document with this id already exists in the collection
    #[error("Document '{id}' already exists in collection '{collection}'")]
    DuplicateId { collection: String, id: String },

    /// Embedding generation failed
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Generation capability failed or returned no output
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Generation did not finish within the configured budget
    #[error("Generation timed out after {timeout:?}")]
    GenerationTimeout { timeout: Duration },

    /// The external fine-tuning job could not be launched
    #[error("Fine-tuning job error: {0}")]
    FineTune(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Create a duplicate id error
    pub fn duplicate_id(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::DuplicateId {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// Create a fine-tuning error
    pub fn fine_tune(message: impl Into<String>) -> Self {
        Self::FineTune(message.into())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Internal(format!("Task join error: {}", err))
    }
}
