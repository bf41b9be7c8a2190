//! Document synchronization.
//!
//! A sync attempt fetches the local and remote snapshot of one document,
//! diffs them field by field, settles what it can automatically, and waits
//! for decisions on the rest before writing the merged result to both stores.
//!
//! Pieces, in pipeline order:
//!
//! - [`tracker`]: field-level diff
//! - [`classifier`]: automatic vs manual conflicts
//! - [`resolution`]: merged snapshot from decisions
//! - [`SyncOrchestrator`]: sessions, retries, and commits

pub mod classifier;
mod orchestrator;
mod provider;
mod registry;
pub mod resolution;
mod retry;
mod session;
pub mod tracker;

#[cfg(test)]
mod testing;

use thiserror::Error;

use crate::error::Error;
use crate::models::{DocumentId, Field};

pub use classifier::Classification;
pub use orchestrator::{SyncOrchestrator, SyncProgress};
pub use provider::{PreferSide, ResolutionProvider};
pub use registry::{InFlightGuard, SessionRegistry};
pub use retry::RetryPolicy;
pub use session::{FailureKind, SyncSession, SyncStatus};

/// Result type alias for sync operations
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Why a sync operation did not complete
#[derive(Debug, Error)]
pub enum SyncError {
    /// A store stayed unreachable after every retry
    #[error("Store unreachable: {0}")]
    Network(String),

    /// The remote kept moving while we tried to commit
    #[error("Remote changed {attempts} times during commit, giving up")]
    TooManyRetries { attempts: u32 },

    #[error("Missing resolution for: {}", join_fields(.missing))]
    IncompleteResolution { missing: Vec<Field> },

    #[error("Invalid resolution: {0}")]
    InvalidResolution(String),

    #[error("Document {0} is already syncing")]
    AlreadySyncing(DocumentId),

    #[error("Sync cancelled")]
    Cancelled,

    #[error("No sync is waiting on document {0}")]
    NoPendingSession(DocumentId),

    /// Any non-transient store failure
    #[error(transparent)]
    Store(Error),
}

impl SyncError {
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Network(_) => FailureKind::Network,
            Self::TooManyRetries { .. } => FailureKind::TooManyRetries,
            Self::IncompleteResolution { .. } => FailureKind::IncompleteResolution,
            Self::InvalidResolution(_) => FailureKind::InvalidResolution,
            Self::AlreadySyncing(_) => FailureKind::AlreadySyncing,
            Self::Cancelled => FailureKind::Cancelled,
            Self::NoPendingSession(_) => FailureKind::NoPendingSession,
            Self::Store(_) => FailureKind::Store,
        }
    }
}

impl From<Error> for SyncError {
    fn from(error: Error) -> Self {
        match error {
            Error::Network(message) => Self::Network(message),
            other => Self::Store(other),
        }
    }
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|field| field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn network_store_errors_stay_network() {
        let error = SyncError::from(Error::Network("timeout".into()));
        assert_eq!(error.kind(), FailureKind::Network);

        let error = SyncError::from(Error::NotFound(DocumentId::new()));
        assert_eq!(error.kind(), FailureKind::Store);
    }

    #[test]
    fn incomplete_resolution_names_fields() {
        let error = SyncError::IncompleteResolution {
            missing: vec![Field::Title, Field::CoverImage],
        };
        assert_eq!(
            error.to_string(),
            "Missing resolution for: title, coverImage"
        );
    }
}
