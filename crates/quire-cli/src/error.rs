use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] quire_core::Error),
    #[error(transparent)]
    Sync(#[from] quire_core::SyncError),
    #[error(transparent)]
    Config(#[from] quire_core::ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Document title cannot be empty")]
    EmptyTitle,
    #[error("Invalid document ID: {0}")]
    InvalidDocumentId(String),
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("Failed to resolve the data directory; pass --local-db and --remote-db")]
    NoDataDir,
}
