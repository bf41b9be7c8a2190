//! Error types for quire-core

use thiserror::Error;

use crate::models::{DocumentId, Revision};

/// Result type alias using quire-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by models and document stores
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Document not found in a store
    #[error("Document not found: {0}")]
    NotFound(DocumentId),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Store unreachable; the only transient kind
    #[error("Network error: {0}")]
    Network(String),

    /// Remote revision moved since it was last read
    #[error("Revision conflict: expected revision {expected}, remote is at {actual}")]
    RevisionConflict {
        /// Revision the writer based its change on
        expected: Revision,
        /// Revision the remote store actually holds
        actual: Revision,
    },
}

impl Error {
    /// Whether retrying the same operation may succeed
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
