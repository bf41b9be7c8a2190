//! Document stores consumed by the sync engine
//!
//! The engine only ever talks to these two traits. Transport and storage
//! encodings belong to the implementations.

mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{DocumentId, DocumentSnapshot, Revision};

pub use memory::{MemoryLocalStore, MemoryRemoteStore};

/// Device-local document cache
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Load the cached snapshot for a document
    async fn get_local(&self, id: &DocumentId) -> Result<DocumentSnapshot>;

    /// Replace the cached snapshot atomically
    async fn put_local(&self, id: &DocumentId, snapshot: &DocumentSnapshot) -> Result<()>;
}

/// Authoritative remote copy
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Load the current snapshot, including its revision
    async fn get_remote(&self, id: &DocumentId) -> Result<DocumentSnapshot>;

    /// Write `snapshot` if the remote is still at `expected_revision`.
    ///
    /// Returns the newly assigned revision, or `Error::RevisionConflict` when
    /// another writer committed first.
    async fn put_remote(
        &self,
        id: &DocumentId,
        snapshot: &DocumentSnapshot,
        expected_revision: Revision,
    ) -> Result<Revision>;
}
